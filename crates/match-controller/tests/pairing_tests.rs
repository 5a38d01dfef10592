//! Pure pairing/regrouping round-function tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashMap;

use match_controller::keys;
use match_controller::models::{Gender, Language, MatchingProfile, Region};
use match_controller::services::pairing::{pair_within_buckets, regroup_remaining};
use match_test_utils::fixtures;

fn bucket(
    key: &str,
    ids: &[&str],
    gender: Gender,
    language: Language,
    region: Region,
) -> (String, Vec<MatchingProfile>) {
    (
        key.to_string(),
        ids.iter()
            .map(|id| fixtures::profile(id, gender, language, region))
            .collect(),
    )
}

#[test]
fn test_pairs_in_arrival_order() {
    let groups = HashMap::from([bucket(
        "male:ko:kr",
        &["a", "b", "c", "d"],
        Gender::Male,
        Language::Ko,
        Region::Kr,
    )]);

    let outcome = pair_within_buckets(groups);

    assert_eq!(outcome.pairs.len(), 2);
    let ids: Vec<(String, String)> = outcome
        .pairs
        .iter()
        .map(|(f, s)| (f.external_id.clone(), s.external_id.clone()))
        .collect();
    assert_eq!(
        ids,
        vec![
            ("a".to_string(), "b".to_string()),
            ("c".to_string(), "d".to_string()),
        ]
    );
    assert!(outcome.remaining.is_empty());
}

#[test]
fn test_odd_trailing_member_remains() {
    let groups = HashMap::from([bucket(
        "male:ko:kr",
        &["a", "b", "c"],
        Gender::Male,
        Language::Ko,
        Region::Kr,
    )]);

    let outcome = pair_within_buckets(groups);

    assert_eq!(outcome.pairs.len(), 1);
    let leftover = outcome.remaining.get("male:ko:kr").unwrap();
    assert_eq!(leftover.len(), 1);
    assert_eq!(leftover.first().unwrap().external_id, "c");
}

#[test]
fn test_no_pairing_across_buckets_in_one_round() {
    let groups = HashMap::from([
        bucket("male:ko:kr", &["a"], Gender::Male, Language::Ko, Region::Kr),
        bucket("male:ko:jp", &["b"], Gender::Male, Language::Ko, Region::Jp),
    ]);

    let outcome = pair_within_buckets(groups);

    assert!(outcome.pairs.is_empty());
    assert_eq!(outcome.remaining.len(), 2);
}

#[test]
fn test_regroup_merges_small_pools() {
    let remaining = HashMap::from([
        bucket("male:ko:kr", &["a"], Gender::Male, Language::Ko, Region::Kr),
        bucket(
            "female:en:us",
            &["b"],
            Gender::Female,
            Language::En,
            Region::Us,
        ),
    ]);

    let regrouped = regroup_remaining(remaining, 6);

    assert_eq!(regrouped.len(), 1);
    let merged = regrouped.get(keys::MERGED_BUCKET_KEY).unwrap();
    assert_eq!(merged.len(), 2);
}

#[test]
fn test_regroup_strips_rightmost_segment_when_large() {
    let remaining = HashMap::from([
        bucket("male:ko:kr", &["a", "b", "c"], Gender::Male, Language::Ko, Region::Kr),
        bucket("male:ko:jp", &["d", "e"], Gender::Male, Language::Ko, Region::Jp),
        bucket("female:en:us", &["f", "g"], Gender::Female, Language::En, Region::Us),
    ]);

    // 7 singles > threshold 6: strip region, group by gender:language.
    let regrouped = regroup_remaining(remaining, 6);

    assert_eq!(regrouped.len(), 2);
    assert_eq!(regrouped.get("male:ko").map(Vec::len), Some(5));
    assert_eq!(regrouped.get("female:en").map(Vec::len), Some(2));
    // Sorted key order: male:ko:jp members precede male:ko:kr members.
    let male_ko: Vec<&str> = regrouped
        .get("male:ko")
        .unwrap()
        .iter()
        .map(|p| p.external_id.as_str())
        .collect();
    assert_eq!(male_ko, vec!["d", "e", "a", "b", "c"]);
}

#[test]
fn test_regroup_empty_input() {
    assert!(regroup_remaining(HashMap::new(), 6).is_empty());
}

#[test]
fn test_merged_pool_pairs_across_gender() {
    // Scarcity relaxation: a tiny leftover pool pairs across every
    // attribute, gender included.
    let remaining = HashMap::from([
        bucket("male:ko:kr", &["a"], Gender::Male, Language::Ko, Region::Kr),
        bucket(
            "female:ko:kr",
            &["b"],
            Gender::Female,
            Language::Ko,
            Region::Kr,
        ),
    ]);

    let regrouped = regroup_remaining(remaining, 6);
    let outcome = pair_within_buckets(regrouped);

    assert_eq!(outcome.pairs.len(), 1);
    assert!(outcome.remaining.is_empty());
}
