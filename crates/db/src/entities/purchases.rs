//! `SeaORM` Entity for purchases table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "purchases")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    pub vendor_id: Uuid,
    pub bill_date: Date,
    pub status: String,
    pub payment_method: String,
    pub cash_bank_id: Option<Uuid>,
    #[sea_orm(column_type = "Decimal(Some((20, 4)))")]
    pub subtotal: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 4)))")]
    pub tax_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 4)))")]
    pub pph21_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 4)))")]
    pub pph23_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 4)))")]
    pub total_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 4)))")]
    pub paid_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 4)))")]
    pub outstanding_amount: Decimal,
    pub payment_status: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::cash_banks::Entity",
        from = "Column::CashBankId",
        to = "super::cash_banks::Column::Id"
    )]
    CashBanks,
}

impl Related<super::cash_banks::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CashBanks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
