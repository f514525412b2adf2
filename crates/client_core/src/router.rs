use serde::{Deserialize, Serialize};
use shared::domain::Role;

use crate::ui::DEFAULT_ACTIVE_VIEW;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DashboardVariant {
    Employee,
    Hr,
    Admin,
}

impl DashboardVariant {
    pub fn for_role(role: Option<Role>) -> Self {
        match role {
            Some(Role::Admin) => DashboardVariant::Admin,
            Some(Role::Hr) => DashboardVariant::Hr,
            // Anything we cannot place gets the least-privileged dashboard.
            Some(Role::User) | Some(Role::Unrecognized) | None => DashboardVariant::Employee,
        }
    }

    pub fn default_view(self) -> &'static str {
        DEFAULT_ACTIVE_VIEW
    }

    pub fn sections(self) -> &'static [&'static str] {
        match self {
            DashboardVariant::Employee => &[
                "dashboard",
                "my-skills",
                "assessments",
                "learning",
                "profile",
            ],
            DashboardVariant::Hr => &[
                "dashboard",
                "employees",
                "skill-matrix",
                "assessments",
                "reports",
                "profile",
            ],
            DashboardVariant::Admin => &[
                "dashboard",
                "users",
                "departments",
                "skill-catalog",
                "reports",
                "settings",
            ],
        }
    }

    pub fn offers_section(self, view: &str) -> bool {
        self.sections().contains(&view)
    }

    pub fn title(self) -> &'static str {
        match self {
            DashboardVariant::Employee => "Employee Dashboard",
            DashboardVariant::Hr => "HR Dashboard",
            DashboardVariant::Admin => "Admin Dashboard",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "surface", content = "dashboard", rename_all = "snake_case")]
pub enum Route {
    Login,
    Dashboard(DashboardVariant),
}

pub fn route(is_authenticated: bool, role: Option<Role>) -> Route {
    if !is_authenticated {
        return Route::Login;
    }
    Route::Dashboard(DashboardVariant::for_role(role))
}

#[cfg(test)]
#[path = "tests/router_tests.rs"]
mod tests;
