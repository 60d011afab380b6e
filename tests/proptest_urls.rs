//! Property-based tests using proptest
//!
//! These tests verify URL resolution against the endpoint and the
//! client-side name lookup using randomized inputs.

use dspc::api::client::find_by_name;
use dspc::api::http::{parse_endpoint, resolve_url};
use dspc::VirtualMachine;
use proptest::prelude::*;

/// Generate a base URL without a path
fn arb_origin() -> impl Strategy<Value = String> {
    (
        prop_oneof!["http", "https"],
        "[a-z][a-z0-9]{0,10}(\\.[a-z]{2,5})?",
        prop::option::of(1024u16..65535),
    )
        .prop_map(|(scheme, host, port)| match port {
            Some(port) => format!("{scheme}://{host}:{port}"),
            None => format!("{scheme}://{host}"),
        })
}

/// Generate a relative path of 1-4 plain segments
fn arb_segments() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z0-9][a-z0-9_-]{0,11}", 1..4)
}

/// Generate a list of VM names
fn arb_names() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z][a-z0-9-]{0,20}", 0..50)
}

fn vms(names: &[String]) -> Vec<VirtualMachine> {
    names.iter().map(VirtualMachine::new).collect()
}

proptest! {
    /// Trailing slash on the base and leading slash on the path never
    /// change the resolved URL for a root endpoint
    #[test]
    fn slashes_resolve_to_one_url(origin in arb_origin(), segments in arb_segments()) {
        let relative = segments.join("/");
        let expected = resolve_url(&parse_endpoint(&origin).unwrap(), &relative).unwrap();

        for base in [origin.clone(), format!("{origin}/")] {
            let base = parse_endpoint(&base).unwrap();
            for candidate in [relative.clone(), format!("/{relative}")] {
                prop_assert_eq!(resolve_url(&base, &candidate).unwrap(), expected.clone());
            }
        }

        let canonical = format!("{}/{}", origin, relative);
        prop_assert_eq!(expected.as_str(), canonical.as_str());
    }

    /// Relative paths land under the endpoint's own path
    #[test]
    fn relative_path_appends_under_base(
        origin in arb_origin(),
        prefix in arb_segments(),
        segments in arb_segments(),
        trailing in any::<bool>(),
    ) {
        let mut endpoint = format!("{}/{}", origin, prefix.join("/"));
        if trailing {
            endpoint.push('/');
        }
        let relative = segments.join("/");

        let resolved = resolve_url(&parse_endpoint(&endpoint).unwrap(), &relative).unwrap();

        let under_base = format!("{}/{}/{}", origin, prefix.join("/"), relative);
        prop_assert_eq!(resolved.as_str(), under_base.as_str());
    }

    /// Absolute paths replace the endpoint's path
    #[test]
    fn absolute_path_replaces_base_path(
        origin in arb_origin(),
        prefix in arb_segments(),
        segments in arb_segments(),
    ) {
        let endpoint = format!("{}/{}", origin, prefix.join("/"));
        let absolute = format!("/{}", segments.join("/"));

        let resolved = resolve_url(&parse_endpoint(&endpoint).unwrap(), &absolute).unwrap();

        let replaced = format!("{}{}", origin, absolute);
        prop_assert_eq!(resolved.as_str(), replaced.as_str());
    }

    /// Every listed name is found, and returned unchanged
    #[test]
    fn listed_names_are_found(names in arb_names()) {
        for name in &names {
            let vm = find_by_name(vms(&names), name).unwrap();
            prop_assert_eq!(&vm.name, name);
        }
    }

    /// Names absent from the listing are NotFound
    #[test]
    fn unlisted_names_are_not_found(names in arb_names(), wanted in "[a-z][a-z0-9-]{0,20}") {
        prop_assume!(!names.contains(&wanted));
        let err = find_by_name(vms(&names), &wanted).unwrap_err();
        prop_assert!(err.is_not_found());
    }

    /// Lookup is case-sensitive
    #[test]
    fn lookup_is_case_sensitive(names in arb_names(), wanted in "[a-z][a-z0-9-]{0,20}") {
        let upper = wanted.to_uppercase();
        prop_assume!(!names.contains(&upper));
        let mut listed = names.clone();
        listed.push(wanted);

        prop_assert!(find_by_name(vms(&listed), &upper).unwrap_err().is_not_found());
    }
}
