use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, EnumString, Display, AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RequestType {
    #[serde(alias = "vacaciones")]
    Vacation,
    #[serde(alias = "permiso")]
    Permit,
    #[serde(alias = "insumos")]
    Materials,
    #[serde(alias = "vehiculo")]
    Vehicle,
    #[serde(alias = "otro")]
    Other,
}

impl RequestType {
    /// Vacation and permit requests must name the days they cover.
    pub fn requires_date_range(&self) -> bool {
        matches!(self, RequestType::Vacation | RequestType::Permit)
    }
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RequestStatus {
    /// Waiting for the unit chief.
    PendingApproval,
    /// Approved by the chief, waiting for the manager.
    PendingAuthorization,
    /// Administrative review; no request transition produces it.
    PendingAdmin,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Approved | RequestStatus::Rejected)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EmployeeSummary {
    #[schema(example = "Ana Martinez")]
    pub full_name: String,
    #[schema(example = 3)]
    pub department_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 42,
    "employee_id": 7,
    "type": "vacation",
    "description": "Family trip",
    "start_date": "2025-06-02",
    "end_date": "2025-06-06",
    "status": "pending_approval",
    "created_at": "2025-05-20T14:00:00Z",
    "updated_at": "2025-05-20T14:00:00Z"
}))]
pub struct Request {
    pub id: u64,
    pub employee_id: u64,
    #[serde(rename = "type")]
    pub request_type: RequestType,
    pub description: String,
    #[schema(format = "date", value_type = Option<String>)]
    pub start_date: Option<NaiveDate>,
    #[schema(format = "date", value_type = Option<String>)]
    pub end_date: Option<NaiveDate>,
    pub status: RequestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee: Option<EmployeeSummary>,
}

/// Body of `POST /requests`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewRequest {
    #[serde(rename = "type")]
    #[schema(example = "vacation")]
    pub request_type: RequestType,
    #[serde(default)]
    #[schema(example = "Family trip")]
    pub description: String,
    #[serde(default)]
    #[schema(example = "2025-06-02", format = "date", value_type = Option<String>)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    #[schema(example = "2025-06-06", format = "date", value_type = Option<String>)]
    pub end_date: Option<NaiveDate>,
}

impl NewRequest {
    pub fn validate(&self) -> AppResult<()> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) if start > end => {
                return Err(AppError::Validation(
                    "start_date cannot be after end_date".into(),
                ));
            }
            (Some(_), Some(_)) => {}
            (None, None) if !self.request_type.requires_date_range() => {}
            _ if self.request_type.requires_date_range() => {
                return Err(AppError::Validation(format!(
                    "{} requests require start_date and end_date",
                    self.request_type
                )));
            }
            _ => {
                return Err(AppError::Validation(
                    "start_date and end_date must be given together".into(),
                ));
            }
        }

        if !self.request_type.requires_date_range() && self.description.trim().is_empty() {
            return Err(AppError::Validation("description must not be empty".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn new_request(kind: RequestType, description: &str) -> NewRequest {
        NewRequest {
            request_type: kind,
            description: description.to_string(),
            start_date: None,
            end_date: None,
        }
    }

    #[test]
    fn vacation_without_dates_is_invalid() {
        let req = new_request(RequestType::Vacation, "beach");
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn permit_without_description_or_dates_is_invalid() {
        let req = new_request(RequestType::Permit, "");
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn dated_request_may_omit_description() {
        let mut req = new_request(RequestType::Vacation, "");
        req.start_date = Some(date("2025-06-02"));
        req.end_date = Some(date("2025-06-06"));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn inverted_range_is_invalid() {
        let mut req = new_request(RequestType::Permit, "doctor");
        req.start_date = Some(date("2025-06-06"));
        req.end_date = Some(date("2025-06-02"));
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn materials_need_a_description() {
        assert!(new_request(RequestType::Materials, "  ").validate().is_err());
        assert!(new_request(RequestType::Materials, "gloves").validate().is_ok());
    }

    #[test]
    fn half_open_range_is_invalid() {
        let mut req = new_request(RequestType::Vehicle, "pickup for field visit");
        req.start_date = Some(date("2025-06-02"));
        assert!(req.validate().is_err());
    }

    #[test]
    fn spanish_type_names_are_accepted() {
        let req: NewRequest =
            serde_json::from_str(r#"{"type":"vacaciones","description":"x"}"#).unwrap();
        assert_eq!(req.request_type, RequestType::Vacation);
        let req: NewRequest = serde_json::from_str(r#"{"type":"insumos"}"#).unwrap();
        assert_eq!(req.request_type, RequestType::Materials);
    }

    #[test]
    fn status_round_trips_through_db_text() {
        assert_eq!(RequestStatus::PendingAuthorization.as_ref(), "pending_authorization");
        assert_eq!(
            "pending_approval".parse::<RequestStatus>().unwrap(),
            RequestStatus::PendingApproval
        );
    }
}
