//! Named-range bindings for entities kept on the member registry sheet.

use crate::domain::{MappingError, MappingTable};

/// Member fields bound to the registry's named column ranges.
///
/// Login and registration state live on the same row as the contact details.
///
/// # Errors
///
/// Returns [`MappingError`] if the table stops being a bijection.
pub fn member_table() -> Result<MappingTable, MappingError> {
    MappingTable::new([
        ("id", "memberId"),
        ("createdAt", "created"),
        ("updatedAt", "updated"),
        ("emailAddress", "email"),
        ("firstName", "firstName"),
        ("lastName", "lastName"),
        ("phoneNumber", "phone"),
        ("address", "address"),
        ("interests", "interests"),
        ("loginStatus", "loginStatus"),
        ("authToken", "authToken"),
        ("authExpiration", "authExpires"),
        ("loginErrors", "loginErrors"),
        ("level", "level"),
        ("registrationStatus", "registrationStatus"),
        ("waiverSigned", "waiverSigned"),
        ("waiverDate", "waiverDate"),
        ("waiverPdfLink", "waiverPdf"),
    ])
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::{Entity, Mappable, Member, MemberProfile};
    use chrono::Utc;

    #[test]
    fn member_table_is_a_bijection() {
        let table = member_table().expect("valid table");
        let backend: std::collections::BTreeSet<_> = table.backend_keys().collect();
        assert_eq!(backend.len(), table.local_keys().count());
    }

    #[test]
    fn member_round_trips_through_the_sheet_table() {
        let table = member_table().expect("valid table");
        let member = Member::new("a@b.org", "basic").with_profile(MemberProfile {
            first_name: "Ada".into(),
            interests: vec!["hiking".into()],
            ..MemberProfile::default()
        });
        let entity = Entity::new(member, Utc::now());
        let fields = table.from_record(&table.to_record(&entity.to_fields()));
        let restored = Entity::<Member>::from_fields(&fields, Utc::now());
        assert_eq!(restored.body().to_fields(), entity.body().to_fields());
    }
}
