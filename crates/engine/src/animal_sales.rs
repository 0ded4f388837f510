//! The module contains `AnimalSale`, the realized profit/loss record written
//! when an animal is sold, and its payment bookkeeping.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Money, ResultEngine,
    animals::Animal,
    util::{
        ensure_non_negative, ensure_positive, parse_decimal, parse_money, parse_optional_uuid,
        parse_uuid,
    },
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Transfer,
    Cheque,
    Credit,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Transfer => "transfer",
            Self::Cheque => "cheque",
            Self::Credit => "credit",
        }
    }
}

impl TryFrom<&str> for PaymentMethod {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "cash" => Ok(Self::Cash),
            "transfer" => Ok(Self::Transfer),
            "cheque" => Ok(Self::Cheque),
            "credit" => Ok(Self::Credit),
            other => Err(EngineError::UnknownVariant(format!("payment method {other:?}"))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Partial,
    Pending,
}

/// What the buyer agreed to pay.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleTerms {
    pub weight: Decimal,
    pub price_per_kg: Decimal,
    pub sale_date: NaiveDate,
    pub customer_id: Option<String>,
    pub payment_method: PaymentMethod,
    pub paid_amount: Money,
}

/// Settlement figures for one sale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleFigures {
    pub sale_price: Money,
    pub total_cost: Money,
    pub profit: Money,
    pub profit_percentage: Option<Decimal>,
    pub paid_amount: Money,
    pub remaining_amount: Money,
}

impl SaleFigures {
    /// Prices `weight * price_per_kg` against the frozen `total_cost`.
    pub fn compute(
        weight: Decimal,
        price_per_kg: Decimal,
        total_cost: Money,
        paid_amount: Money,
    ) -> ResultEngine<Self> {
        ensure_positive(weight, "weight")?;
        ensure_positive(price_per_kg, "price_per_kg")?;
        ensure_non_negative(paid_amount.amount(), "paid_amount")?;

        let sale_price = Money::from_product(weight, price_per_kg)?;
        if paid_amount > sale_price {
            return Err(EngineError::OverPayment(format!(
                "paid {paid_amount} exceeds sale price {sale_price}"
            )));
        }
        let profit = sale_price - total_cost;
        Ok(Self {
            sale_price,
            total_cost,
            profit,
            profit_percentage: profit.percent_of(total_cost),
            paid_amount,
            remaining_amount: (sale_price - paid_amount).max(Money::ZERO),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnimalSale {
    pub id: Uuid,
    pub animal_id: Uuid,
    pub batch_id: Option<Uuid>,
    pub sale_date: NaiveDate,
    pub weight: Decimal,
    pub price_per_kg: Decimal,
    pub sale_price: Money,
    /// Copy of the animal's cost at the moment of sale.
    pub total_cost: Money,
    pub profit: Money,
    pub profit_percentage: Option<Decimal>,
    pub customer_id: Option<String>,
    pub payment_method: PaymentMethod,
    pub paid_amount: Money,
    pub remaining_amount: Money,
    pub created_at: DateTime<Utc>,
}

impl AnimalSale {
    /// Settles `animal` under `terms`. The animal itself is not touched.
    pub fn settle(animal: &Animal, terms: &SaleTerms) -> ResultEngine<Self> {
        let figures = SaleFigures::compute(
            terms.weight,
            terms.price_per_kg,
            animal.total_cost,
            terms.paid_amount,
        )?;
        Ok(Self {
            id: Uuid::new_v4(),
            animal_id: animal.id,
            batch_id: animal.batch_id,
            sale_date: terms.sale_date,
            weight: terms.weight,
            price_per_kg: terms.price_per_kg,
            sale_price: figures.sale_price,
            total_cost: figures.total_cost,
            profit: figures.profit,
            profit_percentage: figures.profit_percentage,
            customer_id: terms.customer_id.clone(),
            payment_method: terms.payment_method,
            paid_amount: figures.paid_amount,
            remaining_amount: figures.remaining_amount,
            created_at: Utc::now(),
        })
    }

    pub fn payment_status(&self) -> PaymentStatus {
        if self.remaining_amount.is_zero() {
            PaymentStatus::Paid
        } else if self.paid_amount.is_zero() {
            PaymentStatus::Pending
        } else {
            PaymentStatus::Partial
        }
    }

    /// Books an instalment against the outstanding balance.
    pub fn apply_payment(&mut self, amount: Money) -> ResultEngine<()> {
        ensure_positive(amount.amount(), "payment")?;
        if amount > self.remaining_amount {
            return Err(EngineError::OverPayment(format!(
                "payment {amount} exceeds remaining {}",
                self.remaining_amount
            )));
        }
        self.paid_amount += amount;
        self.remaining_amount -= amount;
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "animal_sales")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub animal_id: String,
    pub batch_id: Option<String>,
    pub sale_date: Date,
    pub weight: String,
    pub price_per_kg: String,
    pub sale_price: String,
    pub total_cost: String,
    pub profit: String,
    pub profit_percentage: Option<String>,
    pub customer_id: Option<String>,
    pub payment_method: String,
    pub paid_amount: String,
    pub remaining_amount: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::animals::Entity",
        from = "Column::AnimalId",
        to = "super::animals::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Animals,
}

impl Related<super::animals::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Animals.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&AnimalSale> for ActiveModel {
    fn from(sale: &AnimalSale) -> Self {
        Self {
            id: ActiveValue::Set(sale.id.to_string()),
            animal_id: ActiveValue::Set(sale.animal_id.to_string()),
            batch_id: ActiveValue::Set(sale.batch_id.map(|id| id.to_string())),
            sale_date: ActiveValue::Set(sale.sale_date),
            weight: ActiveValue::Set(sale.weight.to_string()),
            price_per_kg: ActiveValue::Set(sale.price_per_kg.to_string()),
            sale_price: ActiveValue::Set(sale.sale_price.to_string()),
            total_cost: ActiveValue::Set(sale.total_cost.to_string()),
            profit: ActiveValue::Set(sale.profit.to_string()),
            profit_percentage: ActiveValue::Set(sale.profit_percentage.map(|p| p.to_string())),
            customer_id: ActiveValue::Set(sale.customer_id.clone()),
            payment_method: ActiveValue::Set(sale.payment_method.as_str().to_string()),
            paid_amount: ActiveValue::Set(sale.paid_amount.to_string()),
            remaining_amount: ActiveValue::Set(sale.remaining_amount.to_string()),
            created_at: ActiveValue::Set(sale.created_at),
        }
    }
}

impl TryFrom<Model> for AnimalSale {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "sale")?,
            animal_id: parse_uuid(&model.animal_id, "animal")?,
            batch_id: parse_optional_uuid(model.batch_id.as_deref(), "batch")?,
            weight: parse_decimal(&model.weight, "weight")?,
            price_per_kg: parse_decimal(&model.price_per_kg, "price_per_kg")?,
            sale_price: parse_money(&model.sale_price, "sale_price")?,
            total_cost: parse_money(&model.total_cost, "total_cost")?,
            profit: parse_money(&model.profit, "profit")?,
            profit_percentage: model
                .profit_percentage
                .as_deref()
                .map(|p| parse_decimal(p, "profit_percentage"))
                .transpose()?,
            payment_method: PaymentMethod::try_from(model.payment_method.as_str())?,
            paid_amount: parse_money(&model.paid_amount, "paid_amount")?,
            remaining_amount: parse_money(&model.remaining_amount, "remaining_amount")?,
            sale_date: model.sale_date,
            customer_id: model.customer_id,
            created_at: model.created_at,
        })
    }
}
