//! End-to-end query tests against the in-memory event store
//!
//! Every request goes through the full path: filter compilation, pipeline
//! construction, stage evaluation, enrichment and ranking.

use chrono::NaiveDate;
use domain_news_events::*;
use serde_json::Value;
use std::sync::Arc;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
}

fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn service_over(events: &[Event]) -> NewsEventService<InMemoryEventStore> {
    let taxonomy = Arc::new(TaxonomyTable::embedded().unwrap());
    NewsEventService::new(InMemoryEventStore::from_events(events), taxonomy)
}

fn counts(results: &[Value]) -> Vec<(String, i64)> {
    results
        .iter()
        .map(|row| {
            (
                row["Group_ID"].as_str().unwrap_or_default().to_string(),
                row["Count"].as_i64().unwrap(),
            )
        })
        .collect()
}

fn sample_events() -> Vec<Event> {
    vec![
        Event::new("1", day(1))
            .with_type("190")
            .with_place("Germany", "Berlin", "Berlin")
            .with_location(GeoPoint::new(13.40, 52.52))
            .with_actor(Actor::new("GERMANY").with_location(GeoPoint::new(13.40, 52.52)))
            .with_actor(Actor::new("POLICE"))
            .with_scores(-4.0, -10.0),
        Event::new("2", day(2))
            .with_type("141")
            .with_place("France", "Ile-de-France", "Paris")
            .with_location(GeoPoint::new(2.35, 48.85))
            .with_actor(Actor::new("FRANCE"))
            .with_actor(Actor::new("POLICE"))
            .with_scores(-2.5, -6.5),
        Event::new("3", day(2))
            .with_type("0211")
            .with_place("Germany", "Bavaria", "Munich")
            .with_location(GeoPoint::new(11.58, 48.14))
            .with_actor(Actor::new("GERMANY"))
            .with_scores(3.0, 3.4),
        Event::new("4", day(5))
            .with_type("190")
            .with_place("Germany", "Berlin", "Berlin")
            .with_location(GeoPoint::new(13.38, 52.51))
            .with_scores(-6.0, -10.0),
        Event::new("5", day(6)).with_type("057"),
    ]
}

#[tokio::test]
async fn scenario_a_type_groups_are_counted_enriched_and_ranked() {
    let events = vec![
        Event::new("a", day(1)).with_type("192"),
        Event::new("b", day(1)).with_type("192"),
        Event::new("c", day(1)).with_type("20"),
    ];
    let service = service_over(&events);

    let results = service.types(&params(&[])).await.unwrap();

    assert_eq!(
        counts(&results),
        vec![("192".to_string(), 2), ("20".to_string(), 1)]
    );
    assert_eq!(results[0]["BaseType"], "19");
    assert_eq!(results[0]["Type_Name"], "Occupy territory");
    assert_eq!(results[0]["BaseType_Name"], "FIGHT");
    assert_eq!(results[1]["BaseType"], "20");
}

#[tokio::test]
async fn scenario_b_leading_limit_caps_scanned_events() {
    let events = vec![
        Event::new("a", day(1)).with_type("192"),
        Event::new("b", day(1)).with_type("192"),
        Event::new("c", day(1)).with_type("20"),
    ];
    let service = service_over(&events);

    let results = service.types(&params(&[("limit", "1")])).await.unwrap();

    assert_eq!(counts(&results), vec![("192".to_string(), 1)]);
}

#[tokio::test]
async fn scenario_c_unknown_types_are_left_out() {
    let events = vec![
        Event::new("a", day(1)).with_type("192"),
        Event::new("b", day(1)).with_type("999"),
        Event::new("c", day(1)).with_type("999"),
        Event::new("d", day(1)),
    ];
    let service = service_over(&events);

    let results = service.types(&params(&[])).await.unwrap();

    assert_eq!(counts(&results), vec![("192".to_string(), 1)]);
    let total: i64 = counts(&results).iter().map(|(_, c)| c).sum();
    assert!(total < events.len() as i64);
}

#[tokio::test]
async fn scenario_d_actor_filter_groups_occurrences() {
    let events = vec![
        Event::new("a", day(1)).with_actor(Actor::new("UNITED NATIONS")),
        Event::new("b", day(2)).with_actor(Actor::new("UNITED NATIONS")),
        Event::new("c", day(3)).with_actor(Actor::new("NATO")),
    ];
    let service = service_over(&events);

    let results = service
        .actors(&params(&[("actor", "UNITED NATIONS")]))
        .await
        .unwrap();

    assert_eq!(counts(&results), vec![("UNITED NATIONS".to_string(), 2)]);
    assert_eq!(results[0]["Actor"], "UNITED NATIONS");
}

#[tokio::test]
async fn empty_filter_returns_every_event() {
    let events = sample_events();
    let service = service_over(&events);

    let results = service.events(&params(&[])).await.unwrap();

    assert_eq!(results.len(), events.len());
    assert_eq!(results[0]["GLOBALEVENTID"], "1");
    assert_eq!(results[0]["Date"], "2024-05-01T00:00:00Z");
}

#[tokio::test]
async fn place_groups_conserve_event_counts() {
    let events = sample_events();
    let service = service_over(&events);

    for field in [GroupField::Country, GroupField::Region, GroupField::City] {
        let results = service
            .groups(&params(&[]), field, GroupMembers::None)
            .await
            .unwrap();
        let total: i64 = results.iter().map(|r| r["Count"].as_i64().unwrap()).sum();
        assert_eq!(total, events.len() as i64, "grouping by {}", field);
    }
}

#[tokio::test]
async fn actor_groups_conserve_occurrence_counts() {
    let events = sample_events();
    let service = service_over(&events);

    let results = service.actors(&params(&[])).await.unwrap();

    let occurrences: usize = events.iter().map(|e| e.actors.len()).sum();
    let total: i64 = results.iter().map(|r| r["Count"].as_i64().unwrap()).sum();
    assert_eq!(total, occurrences as i64);
    assert_eq!(results[0]["Group_ID"], "GERMANY");
    assert_eq!(results[0]["Count"], 2);
}

#[tokio::test]
async fn country_groups_carry_member_ids() {
    let events = sample_events();
    let service = service_over(&events);

    let results = service
        .groups(&params(&[]), GroupField::Country, GroupMembers::Ids)
        .await
        .unwrap();

    assert_eq!(results[0]["Group_ID"], "Germany");
    assert_eq!(results[0]["Count"], 3);
    assert_eq!(
        results[0]["Events"],
        serde_json::json!([
            { "GLOBALEVENTID": "1" },
            { "GLOBALEVENTID": "3" },
            { "GLOBALEVENTID": "4" },
        ])
    );
}

#[tokio::test]
async fn city_groups_carry_full_members_and_place_fields() {
    let events = sample_events();
    let service = service_over(&events);

    let results = service
        .groups(&params(&[]), GroupField::City, GroupMembers::Full)
        .await
        .unwrap();

    let berlin = &results[0];
    assert_eq!(berlin["Group_ID"], "Berlin");
    assert_eq!(berlin["Region"], "Berlin");
    assert_eq!(berlin["Country"], "Germany");
    let members = berlin["Events"].as_array().unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(members[1]["Type"], "190");
}

#[tokio::test]
async fn date_range_includes_the_whole_end_day() {
    let events = sample_events();
    let service = service_over(&events);

    let results = service
        .event_ids(&params(&[("from", "2024-05-02"), ("to", "2024-05-05")]))
        .await
        .unwrap();

    let ids: Vec<&str> = results
        .iter()
        .map(|r| r["GLOBALEVENTID"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["2", "3", "4"]);
}

#[tokio::test]
async fn geo_filters_target_event_or_actor_locations() {
    let events = sample_events();
    let service = service_over(&events);

    let near_berlin = [("lat", "52.5"), ("lon", "13.4"), ("radius", "25")];
    let results = service.event_ids(&params(&near_berlin)).await.unwrap();
    assert_eq!(results.len(), 2);

    let mut by_actor = near_berlin.to_vec();
    by_actor.push(("geoTarget", "actor"));
    let results = service.event_ids(&params(&by_actor)).await.unwrap();
    assert_eq!(results, vec![serde_json::json!({ "GLOBALEVENTID": "1" })]);

    let results = service
        .event_ids(&params(&[("bbox", "-5,42,8,51")]))
        .await
        .unwrap();
    assert_eq!(results, vec![serde_json::json!({ "GLOBALEVENTID": "2" })]);
}

#[tokio::test]
async fn type_base_type_and_score_filters_combine() {
    let events = sample_events();
    let service = service_over(&events);

    let results = service
        .event_ids(&params(&[("baseType", "19,14"), ("ToneMax", "-3")]))
        .await
        .unwrap();
    assert_eq!(
        results,
        vec![
            serde_json::json!({ "GLOBALEVENTID": "1" }),
            serde_json::json!({ "GLOBALEVENTID": "4" }),
        ]
    );

    let results = service
        .event_ids(&params(&[("type", "057"), ("type", "0211")]))
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
}

#[tokio::test]
async fn actor_substring_match_is_case_insensitive() {
    let events = sample_events();
    let service = service_over(&events);

    let results = service
        .event_ids(&params(&[("actor", "pol"), ("actorMatch", "contains")]))
        .await
        .unwrap();
    assert_eq!(results.len(), 2);

    let results = service
        .event_ids(&params(&[("actor", "pol")]))
        .await
        .unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn trailing_limit_pages_ranked_groups() {
    let events = sample_events();
    let taxonomy = Arc::new(TaxonomyTable::embedded().unwrap());
    let service = NewsEventService::new(InMemoryEventStore::from_events(&events), taxonomy)
        .with_limit_placement(LimitPlacement::AfterMatch);

    let results = service.types(&params(&[("limit", "1")])).await.unwrap();
    assert_eq!(counts(&results), vec![("190".to_string(), 2)]);

    let results = service.events(&params(&[("limit", "2"), ("type", "190")])).await.unwrap();
    assert_eq!(results.len(), 2);
}

#[tokio::test]
async fn trailing_limit_counts_only_classified_type_groups() {
    let events: Vec<Event> = ["1", "2", "3", "4"]
        .iter()
        .zip(["999", "999", "999", "190"])
        .map(|(id, code)| Event::new(*id, day(1)).with_type(code))
        .collect();
    let taxonomy = Arc::new(TaxonomyTable::embedded().unwrap());
    let service = NewsEventService::new(InMemoryEventStore::from_events(&events), taxonomy)
        .with_limit_placement(LimitPlacement::AfterMatch);

    let results = service.types(&params(&[("limit", "1")])).await.unwrap();
    assert_eq!(counts(&results), vec![("190".to_string(), 1)]);
}

#[tokio::test]
async fn lookups_by_id() {
    let events = sample_events();
    let service = service_over(&events);

    let event = service.event_by_id("3").await.unwrap();
    assert_eq!(event["Type"], "0211");

    let err = service.event_by_id("404").await.unwrap_err();
    assert!(matches!(err, NewsEventError::NotFound { .. }));

    let results = service
        .events_by_ids(&["5,2".to_string(), "77".to_string()])
        .await
        .unwrap();
    let ids: Vec<&str> = results
        .iter()
        .map(|r| r["GLOBALEVENTID"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["2", "5"]);
}
