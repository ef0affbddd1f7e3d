use connectivity_model::topic::{encode, FieldSelector, FilteredTopic, Topic};
use proptest::prelude::*;

#[test]
fn twin_events_round_trip_with_namespaces_and_filter() {
    let topic = FilteredTopic::builder(Topic::TwinEvents)
        .with_namespaces(["ns1", "ns2"])
        .with_filter("eq(a,1)")
        .build();

    let rendered = topic.to_string();
    assert_eq!(
        rendered,
        "_/_/things/twin/events?namespaces=ns1,ns2&filter=eq(a,1)"
    );
    assert_eq!(FilteredTopic::parse(&rendered).expect("round trip"), topic);
}

#[test]
fn connection_announcements_ignore_every_refinement() {
    let topic = FilteredTopic::builder(Topic::ConnectionAnnouncements)
        .with_namespaces(["ns1"])
        .with_filter("eq(a,1)")
        .with_extra_fields(FieldSelector::parse("attributes").expect("selector"))
        .build();

    assert!(topic.namespaces().is_empty());
    assert_eq!(topic.filter(), None);
    assert_eq!(topic.extra_fields(), None);
    assert_eq!(topic.to_string(), "_/_/connections/announcements");

    let parsed = FilteredTopic::parse("_/_/connections/announcements?namespaces=ns1&filter=exists(a)")
        .expect("refinements are dropped, not rejected");
    assert_eq!(parsed, topic);
}

#[test]
fn policy_announcements_accept_namespaces_only() {
    let topic = FilteredTopic::builder(Topic::PolicyAnnouncements)
        .with_namespaces(["org.example"])
        .with_filter("eq(a,1)")
        .build();

    assert_eq!(topic.namespaces(), ["org.example"]);
    assert_eq!(topic.filter(), None);
    assert_eq!(
        topic.to_string(),
        "_/_/policies/announcements?namespaces=org.example"
    );
}

#[test]
fn unknown_query_keys_and_bare_pairs_are_skipped() {
    let topic = FilteredTopic::parse("_/_/things/live/events?foo=bar&namespaces=a&junk")
        .expect("lenient parse");
    assert_eq!(topic.topic(), Topic::LiveEvents);
    assert_eq!(topic.namespaces(), ["a"]);
    assert_eq!(topic.filter(), None);
}

#[test]
fn empty_components_are_treated_as_absent() {
    let topic = FilteredTopic::parse("_/_/things/live/messages?namespaces=&filter=")
        .expect("empty values parse");
    assert_eq!(topic, FilteredTopic::of(Topic::LiveMessages));
    assert_eq!(topic.to_string(), "_/_/things/live/messages");
}

#[test]
fn unknown_topic_names_are_rejected() {
    let err = FilteredTopic::parse("_/_/things/twin/commands?namespaces=a").expect_err("unknown");
    assert_eq!(err.error_code(), "connectivity:topic.invalid");
    assert_eq!(err.input(), "_/_/things/twin/commands?namespaces=a");
    assert!(
        err.to_string().contains("_/_/connections/announcements"),
        "hint lists supported topics: {err}"
    );
}

#[test]
fn plus_decodes_to_space() {
    let topic = FilteredTopic::parse("_/_/things/twin/events?filter=eq(attributes/name,%22a+b%22)")
        .expect("form encoded filter");
    assert_eq!(topic.filter(), Some("eq(attributes/name,\"a b\")"));
}

#[test]
fn reserved_characters_are_escaped() {
    let filter = "like(attributes/code,\"a&b+c%\")";
    let rendered = encode(Topic::LiveEvents, &["org.example"], Some(filter), None);
    assert_eq!(
        rendered,
        "_/_/things/live/events?namespaces=org.example&filter=like(attributes/code,\"a%26b%2Bc%25\")"
    );
    let parsed = FilteredTopic::parse(&rendered).expect("escaped filter parses");
    assert_eq!(parsed.filter(), Some(filter));
}

#[test]
fn namespaces_are_split_and_trimmed_like_the_query() {
    let topic = FilteredTopic::builder(Topic::TwinEvents)
        .with_namespaces(["a,b", " c ", ""])
        .build();

    assert_eq!(topic.namespaces(), ["a", "b", "c"]);
    assert_eq!(topic.to_string(), "_/_/things/twin/events?namespaces=a,b,c");
    assert_eq!(
        FilteredTopic::parse(&topic.to_string()).expect("round trip"),
        topic
    );
}

#[test]
fn non_ascii_filters_render_literally() {
    let topic = FilteredTopic::builder(Topic::TwinEvents)
        .with_filter("eq(attributes/city,\"Zürich\")")
        .build();

    assert_eq!(
        topic.to_string(),
        "_/_/things/twin/events?filter=eq(attributes/city,\"Zürich\")"
    );
    assert_eq!(
        FilteredTopic::parse(&topic.to_string()).expect("round trip"),
        topic
    );
}

#[test]
fn extra_fields_are_expanded_and_rendered_flat() {
    let topic = FilteredTopic::parse(
        "_/_/things/twin/events?extraFields=attributes,features(temp,humidity/value)",
    )
    .expect("selector parses");

    let selector = topic.extra_fields().expect("extra fields present");
    assert_eq!(
        selector.pointers(),
        ["attributes", "features/temp", "features/humidity/value"]
    );
    assert_eq!(
        topic.to_string(),
        "_/_/things/twin/events?extraFields=attributes,features/temp,features/humidity/value"
    );
    assert_eq!(
        FilteredTopic::parse(&topic.to_string()).expect("flat form parses"),
        topic
    );
}

#[test]
fn malformed_extra_fields_are_rejected() {
    let err = FilteredTopic::parse("_/_/things/twin/events?extraFields=features(a")
        .expect_err("unbalanced selector");
    assert_eq!(err.error_code(), "connectivity:topic.invalid");
}

#[test]
fn from_str_matches_parse() {
    let topic: FilteredTopic = "_/_/things/live/commands?namespaces=org.example"
        .parse()
        .expect("FromStr");
    assert_eq!(topic.topic(), Topic::LiveCommands);
    assert_eq!(topic.to_builder().build(), topic);
}

proptest! {
    #[test]
    fn rendered_topics_parse_back_to_themselves(
        topic in prop::sample::select(Topic::ALL.to_vec()),
        namespaces in prop::collection::vec("[a-z0-9., ]{0,12}", 0..4),
        filter in prop::option::of("[a-z0-9(),/\"&+% =?üé]{1,20}"),
    ) {
        let mut builder = FilteredTopic::builder(topic).with_namespaces(namespaces);
        if let Some(filter) = filter {
            builder = builder.with_filter(filter);
        }
        let built = builder.build();

        let parsed = FilteredTopic::parse(&built.to_string()).expect("rendered topic parses");
        prop_assert_eq!(parsed, built);
    }
}
