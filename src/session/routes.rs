use crate::config::SessionConfig;

use super::{can_render, RenderDecision, SessionStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardPage {
    Overview,
    StaffManagement,
    NotifyStaff,
    RoomManagement,
    ServiceManagement,
    BookingHistory,
    SystemLogs,
    WeatherDashboard,
    Settings,
}

impl DashboardPage {
    pub const ALL: [DashboardPage; 9] = [
        DashboardPage::Overview,
        DashboardPage::StaffManagement,
        DashboardPage::NotifyStaff,
        DashboardPage::RoomManagement,
        DashboardPage::ServiceManagement,
        DashboardPage::BookingHistory,
        DashboardPage::SystemLogs,
        DashboardPage::WeatherDashboard,
        DashboardPage::Settings,
    ];

    /// Path segment below `/dashboard`. The spellings are the ones the
    /// deployed front end already links to.
    pub fn segment(&self) -> &'static str {
        match self {
            DashboardPage::Overview => "",
            DashboardPage::StaffManagement => "staff-management",
            DashboardPage::NotifyStaff => "NotifyStaff",
            DashboardPage::RoomManagement => "room-managment",
            DashboardPage::ServiceManagement => "service-managment",
            DashboardPage::BookingHistory => "booking-history",
            DashboardPage::SystemLogs => "systemLogs",
            DashboardPage::WeatherDashboard => "weatherDashboard",
            DashboardPage::Settings => "settings",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Root,
    Login,
    Signup,
    Dashboard(DashboardPage),
    NotFound(String),
}

impl Route {
    pub fn parse(path: &str) -> Route {
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "" => Route::Root,
            "/login" => Route::Login,
            "/signup" => Route::Signup,
            "/dashboard" => Route::Dashboard(DashboardPage::Overview),
            _ => trimmed
                .strip_prefix("/dashboard/")
                .and_then(|segment| DashboardPage::ALL.into_iter().find(|p| p.segment() == segment))
                .map(Route::Dashboard)
                .unwrap_or_else(|| Route::NotFound(path.to_string())),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Root => "/".to_string(),
            Route::Login => "/login".to_string(),
            Route::Signup => "/signup".to_string(),
            Route::Dashboard(DashboardPage::Overview) => "/dashboard".to_string(),
            Route::Dashboard(page) => format!("/dashboard/{}", page.segment()),
            Route::NotFound(path) => path.clone(),
        }
    }

    pub fn is_protected(&self) -> bool {
        matches!(self, Route::Dashboard(_))
    }
}

/// Decide what the shell shows for `route` in the current session.
pub fn navigate(route: &Route, status: &SessionStatus, config: &SessionConfig) -> RenderDecision {
    match route {
        Route::Login | Route::Signup => RenderDecision::Render,
        Route::Dashboard(_) => can_render(status, &config.login_route),
        Route::Root => match status {
            SessionStatus::Unknown | SessionStatus::Checking => RenderDecision::ShowLoadingPlaceholder,
            SessionStatus::Authenticated(_) => RenderDecision::RedirectTo(config.home_route.clone()),
            SessionStatus::Unauthenticated => RenderDecision::RedirectTo(config.login_route.clone()),
        },
        Route::NotFound(_) => RenderDecision::NotFound,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Identity;
    use crate::config::PanelConfig;

    fn authenticated() -> SessionStatus {
        SessionStatus::Authenticated(Identity { id: "1".into(), name: "Alice".into() })
    }

    #[test]
    fn parses_known_paths() {
        assert_eq!(Route::parse("/"), Route::Root);
        assert_eq!(Route::parse("/login"), Route::Login);
        assert_eq!(Route::parse("/dashboard/"), Route::Dashboard(DashboardPage::Overview));
        assert_eq!(
            Route::parse("/dashboard/room-managment"),
            Route::Dashboard(DashboardPage::RoomManagement)
        );
        assert_eq!(Route::parse("/dashboard/nope"), Route::NotFound("/dashboard/nope".into()));
        for page in DashboardPage::ALL {
            assert_eq!(Route::parse(&Route::Dashboard(page).path()), Route::Dashboard(page));
        }
    }

    #[test]
    fn root_redirects_by_session() {
        let config = PanelConfig::development().session;
        assert_eq!(
            navigate(&Route::Root, &authenticated(), &config),
            RenderDecision::RedirectTo("/dashboard".into())
        );
        assert_eq!(
            navigate(&Route::Root, &SessionStatus::Unauthenticated, &config),
            RenderDecision::RedirectTo("/login".into())
        );
        assert_eq!(
            navigate(&Route::Root, &SessionStatus::Checking, &config),
            RenderDecision::ShowLoadingPlaceholder
        );
    }

    #[test]
    fn protected_pages_are_gated_public_pages_are_not() {
        let config = PanelConfig::development().session;
        let staff = Route::Dashboard(DashboardPage::StaffManagement);
        assert!(staff.is_protected());
        assert_eq!(
            navigate(&staff, &SessionStatus::Unauthenticated, &config),
            RenderDecision::RedirectTo("/login".into())
        );
        assert_eq!(navigate(&staff, &authenticated(), &config), RenderDecision::Render);
        assert_eq!(navigate(&Route::Signup, &SessionStatus::Unknown, &config), RenderDecision::Render);
        assert_eq!(
            navigate(&Route::parse("/bogus"), &authenticated(), &config),
            RenderDecision::NotFound
        );
    }
}
