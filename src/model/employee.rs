use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::role::Role;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "id": 7,
        "user_id": 12,
        "full_name": "Ana Martinez",
        "department_id": 3,
        "role": "technician",
        "vacation_days_balance": 15,
        "active": true
    })
)]
pub struct Employee {
    #[schema(example = 7)]
    pub id: u64,

    /// Portal account linked to this employee, if any
    #[schema(example = 12, nullable = true)]
    pub user_id: Option<u64>,

    #[schema(example = "Ana Martinez")]
    pub full_name: String,

    #[schema(example = 3, nullable = true)]
    pub department_id: Option<u64>,

    pub role: Role,

    #[schema(example = 15)]
    pub vacation_days_balance: i64,

    #[schema(example = true)]
    pub active: bool,
}
