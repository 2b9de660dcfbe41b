//! `SeaORM` Entity for cash_bank_transactions table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "cash_bank_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub cash_bank_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((20, 4)))")]
    pub amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 4)))")]
    pub balance_after: Decimal,
    pub reference_type: String,
    pub reference_id: Option<Uuid>,
    pub transaction_date: Date,
    pub notes: String,
    pub deleted_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
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
