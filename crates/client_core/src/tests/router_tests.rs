use super::*;

#[test]
fn unauthenticated_always_routes_to_login() {
    for role in [None, Some(Role::User), Some(Role::Admin)] {
        assert_eq!(route(false, role), Route::Login);
    }
}

#[test]
fn authenticated_roles_select_their_dashboard() {
    assert_eq!(
        route(true, Some(Role::User)),
        Route::Dashboard(DashboardVariant::Employee)
    );
    assert_eq!(
        route(true, Some(Role::Hr)),
        Route::Dashboard(DashboardVariant::Hr)
    );
    assert_eq!(
        route(true, Some(Role::Admin)),
        Route::Dashboard(DashboardVariant::Admin)
    );
}

#[test]
fn unknown_role_falls_back_to_least_privilege() {
    assert_eq!(
        route(true, Some(Role::Unrecognized)),
        Route::Dashboard(DashboardVariant::Employee)
    );
    assert_eq!(route(true, None), Route::Dashboard(DashboardVariant::Employee));

    let parsed: Role = serde_json::from_str("\"superuser\"").expect("role");
    assert_eq!(
        route(true, Some(parsed)),
        Route::Dashboard(DashboardVariant::Employee)
    );
}

#[test]
fn every_dashboard_offers_its_default_view() {
    for variant in [
        DashboardVariant::Employee,
        DashboardVariant::Hr,
        DashboardVariant::Admin,
    ] {
        assert!(variant.offers_section(variant.default_view()), "{variant:?}");
    }
    assert!(!DashboardVariant::Employee.offers_section("users"));
    assert!(DashboardVariant::Admin.offers_section("users"));
}
