//! The module contains `PerformanceGoal` and the KPI evaluation.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine,
    money::round_to,
    util::{parse_decimal, parse_optional_uuid, parse_uuid},
};

/// Places kept on KPI values and on goal progress.
pub const KPI_SCALE: u32 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    /// Average daily gain.
    Adg,
    /// Feed conversion ratio.
    Fcr,
    CostPerHead,
    Profit,
    Custom,
}

impl GoalType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Adg => "adg",
            Self::Fcr => "fcr",
            Self::CostPerHead => "cost_per_head",
            Self::Profit => "profit",
            Self::Custom => "custom",
        }
    }
}

impl TryFrom<&str> for GoalType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "adg" => Ok(Self::Adg),
            "fcr" => Ok(Self::Fcr),
            "cost_per_head" => Ok(Self::CostPerHead),
            "profit" => Ok(Self::Profit),
            "custom" => Ok(Self::Custom),
            other => Err(EngineError::InvalidGoal(format!("unknown goal type: {other}"))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Active,
    Achieved,
    Expired,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalEvaluation {
    /// Fraction of the target reached, between 0 and 1.
    pub progress: Decimal,
    pub status: GoalStatus,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGoal {
    pub name: String,
    pub goal_type: GoalType,
    pub target_value: Decimal,
    pub batch_id: Option<Uuid>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceGoal {
    pub id: Uuid,
    pub name: String,
    pub goal_type: GoalType,
    pub target_value: Decimal,
    pub current_value: Decimal,
    pub batch_id: Option<Uuid>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PerformanceGoal {
    pub fn new(input: &NewGoal) -> ResultEngine<Self> {
        Self::ensure_target(input.target_value)?;
        if let Some(end) = input.end_date
            && end < input.start_date
        {
            return Err(EngineError::InvalidGoal(format!(
                "goal {} ends ({end}) before it starts ({})",
                input.name, input.start_date
            )));
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            name: input.name.clone(),
            goal_type: input.goal_type,
            target_value: input.target_value,
            current_value: Decimal::ZERO,
            batch_id: input.batch_id,
            start_date: input.start_date,
            end_date: input.end_date,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn set_current(&mut self, value: Decimal) {
        self.current_value = round_to(value, KPI_SCALE);
        self.updated_at = Utc::now();
    }

    /// Progress and status as of `today`. Read-only.
    pub fn evaluate(&self, today: NaiveDate) -> ResultEngine<GoalEvaluation> {
        Self::ensure_target(self.target_value)?;

        // A quotient too large for a Decimal is far past either bound.
        let progress = match self.current_value.checked_div(self.target_value) {
            Some(ratio) => round_to(ratio.clamp(Decimal::ZERO, Decimal::ONE), KPI_SCALE),
            None if self.current_value.is_sign_positive() => Decimal::ONE,
            None => Decimal::ZERO,
        };
        let status = if self.current_value >= self.target_value {
            GoalStatus::Achieved
        } else if self.end_date.is_some_and(|end| end < today) {
            GoalStatus::Expired
        } else {
            GoalStatus::Active
        };
        Ok(GoalEvaluation { progress, status })
    }

    fn ensure_target(target: Decimal) -> ResultEngine<()> {
        if target <= Decimal::ZERO {
            return Err(EngineError::InvalidGoal(format!(
                "target value must be > 0, got {target}"
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "performance_goals")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub goal_type: String,
    pub target_value: String,
    pub current_value: String,
    pub batch_id: Option<String>,
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&PerformanceGoal> for ActiveModel {
    fn from(goal: &PerformanceGoal) -> Self {
        Self {
            id: ActiveValue::Set(goal.id.to_string()),
            name: ActiveValue::Set(goal.name.clone()),
            goal_type: ActiveValue::Set(goal.goal_type.as_str().to_string()),
            target_value: ActiveValue::Set(goal.target_value.to_string()),
            current_value: ActiveValue::Set(goal.current_value.to_string()),
            batch_id: ActiveValue::Set(goal.batch_id.map(|id| id.to_string())),
            start_date: ActiveValue::Set(goal.start_date),
            end_date: ActiveValue::Set(goal.end_date),
            created_at: ActiveValue::Set(goal.created_at),
            updated_at: ActiveValue::Set(goal.updated_at),
        }
    }
}

impl TryFrom<Model> for PerformanceGoal {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "goal")?,
            goal_type: GoalType::try_from(model.goal_type.as_str())?,
            target_value: parse_decimal(&model.target_value, "target_value")?,
            current_value: parse_decimal(&model.current_value, "current_value")?,
            batch_id: parse_optional_uuid(model.batch_id.as_deref(), "batch")?,
            name: model.name,
            start_date: model.start_date,
            end_date: model.end_date,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
