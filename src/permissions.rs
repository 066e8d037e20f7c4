//! Club roles, permissions and per-request club access.
//!
//! Each membership carries one role. Roles map to a fixed set of
//! permissions through a static table; handlers resolve a [`ClubAccess`]
//! for the club in the URL and then `require` the permission they need.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use crate::{db::DbPool, error::AppError, middleware::auth::AuthContext};

/// Role of a user within one club.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Owner,
    Admin,
    Coach,
    Treasurer,
    Member,
}

/// Operations gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    ViewClub,
    ManageClub,
    ManageSubscription,
    ManageUsers,
    ViewMembers,
    ManageMembers,
    ManageTeams,
    ManageFacilities,
    ManageBookings,
    ViewFinances,
    ManageFinances,
    ManageEvents,
    PostAnnouncements,
}

impl Permission {
    pub const ALL: [Permission; 13] = [
        Permission::ViewClub,
        Permission::ManageClub,
        Permission::ManageSubscription,
        Permission::ManageUsers,
        Permission::ViewMembers,
        Permission::ManageMembers,
        Permission::ManageTeams,
        Permission::ManageFacilities,
        Permission::ManageBookings,
        Permission::ViewFinances,
        Permission::ManageFinances,
        Permission::ManageEvents,
        Permission::PostAnnouncements,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Permission::ViewClub => "view_club",
            Permission::ManageClub => "manage_club",
            Permission::ManageSubscription => "manage_subscription",
            Permission::ManageUsers => "manage_users",
            Permission::ViewMembers => "view_members",
            Permission::ManageMembers => "manage_members",
            Permission::ManageTeams => "manage_teams",
            Permission::ManageFacilities => "manage_facilities",
            Permission::ManageBookings => "manage_bookings",
            Permission::ViewFinances => "view_finances",
            Permission::ManageFinances => "manage_finances",
            Permission::ManageEvents => "manage_events",
            Permission::PostAnnouncements => "post_announcements",
        }
    }
}

use Permission::*;

const COACH_PERMISSIONS: &[Permission] = &[
    ViewClub,
    ViewMembers,
    ManageMembers,
    ManageTeams,
    ManageBookings,
    ManageEvents,
    PostAnnouncements,
];

const TREASURER_PERMISSIONS: &[Permission] =
    &[ViewClub, ViewMembers, ViewFinances, ManageFinances];

const MEMBER_PERMISSIONS: &[Permission] = &[ViewClub, ViewMembers];

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Owner,
        Role::Admin,
        Role::Coach,
        Role::Treasurer,
        Role::Member,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Coach => "coach",
            Role::Treasurer => "treasurer",
            Role::Member => "member",
        }
    }

    /// Position in the role hierarchy. Coach and treasurer share a rank.
    pub fn rank(self) -> u8 {
        match self {
            Role::Owner => 3,
            Role::Admin => 2,
            Role::Coach | Role::Treasurer => 1,
            Role::Member => 0,
        }
    }

    pub fn has(self, permission: Permission) -> bool {
        match self {
            Role::Owner => true,
            Role::Admin => permission != ManageSubscription,
            Role::Coach => COACH_PERMISSIONS.contains(&permission),
            Role::Treasurer => TREASURER_PERMISSIONS.contains(&permission),
            Role::Member => MEMBER_PERMISSIONS.contains(&permission),
        }
    }

    pub fn permissions(self) -> Vec<Permission> {
        Permission::ALL
            .into_iter()
            .filter(|p| self.has(*p))
            .collect()
    }

    /// Whether this role may assign, change or remove `target`.
    ///
    /// Owners manage every role, including other owners. Everyone else only
    /// manages roles strictly below their own.
    pub fn can_manage(self, target: Role) -> bool {
        self == Role::Owner || self.rank() > target.rank()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| AppError::InvalidRequest(format!("Unknown role '{s}'")))
    }
}

/// The caller's standing in one club.
#[derive(Debug, Clone)]
pub struct ClubAccess {
    pub club_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
}

impl ClubAccess {
    /// Resolve the caller's access to `club_id`.
    ///
    /// Platform admins act as owners of every existing club. Callers without
    /// a membership get `club_not_found`, so club existence is not leaked.
    pub async fn resolve(
        pool: &DbPool,
        auth: &AuthContext,
        club_id: Uuid,
    ) -> Result<Self, AppError> {
        let role: Option<String> = if auth.is_platform_admin {
            sqlx::query_scalar("SELECT 'owner'::text FROM clubs WHERE id = $1")
                .bind(club_id)
                .fetch_optional(pool)
                .await?
        } else {
            sqlx::query_scalar("SELECT role FROM memberships WHERE club_id = $1 AND user_id = $2")
                .bind(club_id)
                .bind(auth.user_id)
                .fetch_optional(pool)
                .await?
        };

        let role = role.ok_or(AppError::NotFound("club"))?.parse::<Role>()?;

        Ok(Self {
            club_id,
            user_id: auth.user_id,
            role,
        })
    }

    /// Fail with 403 unless the role grants `permission`.
    pub fn require(&self, permission: Permission) -> Result<(), AppError> {
        if self.role.has(permission) {
            Ok(())
        } else {
            tracing::debug!(
                club_id = %self.club_id,
                user_id = %self.user_id,
                role = %self.role,
                permission = permission.as_str(),
                "Permission denied"
            );
            Err(AppError::forbidden())
        }
    }

    /// Fail with 403 unless the caller may manage users holding `target`.
    pub fn require_can_manage(&self, target: Role) -> Result<(), AppError> {
        self.require(ManageUsers)?;
        if self.role.can_manage(target) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "A {} cannot manage the {} role",
                self.role, target
            )))
        }
    }

    pub fn permission_names(&self) -> Vec<&'static str> {
        self.role
            .permissions()
            .into_iter()
            .map(Permission::as_str)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn access(role: Role) -> ClubAccess {
        ClubAccess {
            club_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn owner_has_every_permission() {
        assert_eq!(Role::Owner.permissions(), Permission::ALL.to_vec());
    }

    #[test]
    fn admin_cannot_manage_subscription() {
        assert!(!Role::Admin.has(ManageSubscription));
        assert!(Role::Admin.has(ManageUsers));
        assert!(Role::Admin.has(ManageFinances));
        assert_eq!(Role::Admin.permissions().len(), Permission::ALL.len() - 1);
    }

    #[test]
    fn coach_runs_teams_but_not_money_or_users() {
        assert!(Role::Coach.has(ManageTeams));
        assert!(Role::Coach.has(ManageBookings));
        assert!(Role::Coach.has(PostAnnouncements));
        assert!(!Role::Coach.has(ViewFinances));
        assert!(!Role::Coach.has(ManageUsers));
        assert!(!Role::Coach.has(ManageFacilities));
    }

    #[test]
    fn treasurer_handles_finances_only() {
        assert!(Role::Treasurer.has(ViewFinances));
        assert!(Role::Treasurer.has(ManageFinances));
        assert!(!Role::Treasurer.has(ManageTeams));
        assert!(!Role::Treasurer.has(ManageEvents));
    }

    #[test]
    fn member_is_read_only() {
        assert_eq!(Role::Member.permissions(), vec![ViewClub, ViewMembers]);
    }

    #[test]
    fn role_management_follows_rank() {
        assert!(Role::Owner.can_manage(Role::Owner));
        assert!(Role::Admin.can_manage(Role::Coach));
        assert!(Role::Admin.can_manage(Role::Member));
        assert!(!Role::Admin.can_manage(Role::Admin));
        assert!(!Role::Admin.can_manage(Role::Owner));
        assert!(!Role::Coach.can_manage(Role::Treasurer));
    }

    #[test]
    fn roles_parse_from_their_names() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!(matches!(
            "captain".parse::<Role>(),
            Err(AppError::InvalidRequest(_))
        ));
    }

    #[test]
    fn require_reports_forbidden() {
        let member = access(Role::Member);
        assert!(member.require(ViewClub).is_ok());
        assert!(matches!(
            member.require(ManageTeams),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn require_can_manage_needs_manage_users_first() {
        // Coaches outrank members but lack ManageUsers.
        assert!(access(Role::Coach).require_can_manage(Role::Member).is_err());
        assert!(access(Role::Admin).require_can_manage(Role::Member).is_ok());
        assert!(access(Role::Admin).require_can_manage(Role::Owner).is_err());
    }

    #[test]
    fn permission_names_are_snake_case() {
        let names = access(Role::Treasurer).permission_names();
        assert_eq!(
            names,
            vec!["view_club", "view_members", "view_finances", "manage_finances"]
        );
    }
}
