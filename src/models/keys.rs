//! Closed key sets for features, capabilities and roles.
//!
//! Keys arrive from the backend as free-form strings. Known keys map onto
//! named variants; anything else is preserved verbatim in `Unknown` so that a
//! grant for a key this build does not know about is never dropped.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_key {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident => $key:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($variant,)+
            Unknown(String),
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => $key,)+
                    Self::Unknown(key) => key.as_str(),
                }
            }

            pub fn is_known(&self) -> bool {
                !matches!(self, Self::Unknown(_))
            }

            /// Every named variant, in declaration order
            pub fn known() -> Vec<$name> {
                vec![$(Self::$variant),+]
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                match value {
                    $($key => Self::$variant,)+
                    other => Self::Unknown(other.to_string()),
                }
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::from(value.as_str())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> String {
                value.as_str().to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_key! {
    /// A named visibility unit gated by plan tier or explicit grant.
    pub enum FeatureKey {
        DashboardView => "dashboard.view",
        StudentsView => "students.view",
        StudentsManage => "students.manage",
        CoursesView => "courses.view",
        CoursesManage => "courses.manage",
        AttendanceTrack => "attendance.track",
        FeesManage => "fees.manage",
        AdmissionsManage => "admissions.manage",
        AnalyticsView => "analytics.view",
        ReportsExport => "reports.export",
        CommunicationsBulk => "communications.bulk",
        TimetableAuto => "timetable.auto",
        IntegrationsApi => "integrations.api",
        BrandingCustom => "branding.custom",
        AuditLog => "audit.log",
        SsoSaml => "sso.saml",
        MultiCampus => "multi_campus",
    }
}

string_key! {
    /// A fine-grained permitted action. Only ever granted by the backend.
    pub enum CapabilityKey {
        ProfileEdit => "profile.edit",
        StudentsCreate => "students.create",
        StudentsDelete => "students.delete",
        CoursesPublish => "courses.publish",
        FeesCollect => "fees.collect",
        FeesRefund => "fees.refund",
        AdmissionsApprove => "admissions.approve",
        ReportsExport => "reports.export",
        MembersInvite => "members.invite",
        RolesAssign => "roles.assign",
        SettingsBilling => "settings.billing",
        TenantRepair => "tenant.repair",
    }
}

string_key! {
    /// Tenant-scoped role of the identity.
    pub enum RoleKey {
        Owner => "owner",
        Admin => "admin",
        Teacher => "teacher",
        Staff => "staff",
        Student => "student",
        Parent => "parent",
        Member => "member",
    }
}

impl Default for RoleKey {
    fn default() -> Self {
        RoleKey::Member
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_keys_round_trip_through_strings() {
        for feature in FeatureKey::known() {
            assert_eq!(FeatureKey::from(feature.as_str()), feature);
        }
        for capability in CapabilityKey::known() {
            assert_eq!(CapabilityKey::from(capability.to_string()), capability);
        }
    }

    #[test]
    fn test_unknown_key_is_preserved() {
        let feature = FeatureKey::from("library.loans");
        assert_eq!(feature, FeatureKey::Unknown("library.loans".to_string()));
        assert!(!feature.is_known());
        assert_eq!(feature.as_str(), "library.loans");
    }

    #[test]
    fn test_serialized_as_plain_string() {
        let json = serde_json::to_value(FeatureKey::AnalyticsView).unwrap();
        assert_eq!(json, serde_json::json!("analytics.view"));

        let keys: Vec<CapabilityKey> =
            serde_json::from_value(serde_json::json!(["fees.refund", "hostel.assign"])).unwrap();
        assert_eq!(keys[0], CapabilityKey::FeesRefund);
        assert_eq!(keys[1], CapabilityKey::Unknown("hostel.assign".to_string()));
    }
}
