use super::*;
use crate::state::test_helpers;
use std::collections::HashSet;

#[test]
fn colors_cycle_the_palette_round_robin() {
    let state = test_helpers::test_app_state();

    let mut assigned = Vec::new();
    for _ in 0..USER_COLORS.len() + 1 {
        assigned.push(next_color(&state));
    }

    for (i, color) in assigned.iter().take(USER_COLORS.len()).enumerate() {
        assert_eq!(color, USER_COLORS[i]);
    }
    // The palette wraps: one past the end reuses the first color.
    assert_eq!(assigned[USER_COLORS.len()], USER_COLORS[0]);
}

#[test]
fn username_is_adjective_noun_number() {
    for _ in 0..50 {
        let name = generate_username();
        assert!(
            NAME_ADJECTIVES.iter().any(|a| name.starts_with(a)),
            "unexpected adjective in {name}"
        );
        assert!(NAME_NOUNS.iter().any(|n| name.contains(n)), "unexpected noun in {name}");

        let digits: String = name.chars().filter(|c| c.is_ascii_digit()).collect();
        let number: u32 = digits.parse().expect("name ends in a number");
        assert!((10..100).contains(&number));
    }
}

#[test]
fn identities_use_unique_connection_ids() {
    let state = test_helpers::test_app_state();
    let ids: HashSet<_> = (0..100).map(|_| assign_identity(&state).user_id).collect();
    assert_eq!(ids.len(), 100);
}
