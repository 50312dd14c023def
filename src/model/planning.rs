use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

/// One employee's declared field activity for a single day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PlanningEntry {
    pub id: u64,
    pub employee_id: u64,
    #[schema(example = "2025-06-02", format = "date", value_type = String)]
    pub date: NaiveDate,
    pub location: String,
    pub sector: String,
    pub area: String,
    pub resources: String,
    pub service_line: String,
    #[serde(default)]
    pub duration: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department_id: Option<u64>,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /planificacion` and `PUT /planificacion/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewPlanningEntry {
    #[schema(example = 7)]
    pub employee_id: u64,
    #[schema(example = "2025-06-02", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "San Juan")]
    pub location: String,
    #[schema(example = "Rural")]
    pub sector: String,
    #[schema(example = "Watershed")]
    pub area: String,
    #[schema(example = "Pickup, GPS")]
    pub resources: String,
    #[schema(example = "Environment")]
    pub service_line: String,
    #[serde(default)]
    #[schema(example = "4h")]
    pub duration: String,
    #[schema(example = "Spring inspection")]
    pub description: String,
}

impl NewPlanningEntry {
    pub fn validate(&self) -> AppResult<()> {
        let required = [
            ("location", &self.location),
            ("sector", &self.sector),
            ("area", &self.area),
            ("service_line", &self.service_line),
            ("description", &self.description),
        ];
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(AppError::Validation(format!("{field} must not be empty")));
        }
        Ok(())
    }

    /// Stand-in entry written for a weekday nobody planned.
    pub fn placeholder(employee_id: u64, date: NaiveDate) -> Self {
        Self {
            employee_id,
            date,
            location: "N/A".into(),
            sector: "N/A".into(),
            area: "N/A".into(),
            resources: "None".into(),
            service_line: "N/A".into(),
            duration: "N/A".into(),
            description: "Planning not submitted this week".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanningScope {
    All,
    Employee(u64),
    Unit(u64),
}
