mod support;

use task_digest::config::{Config, Credentials, SourceCredentials};
use task_digest::error::Error;
use task_digest::urgency::{TierPolicy, UrgencyTier};

use support::ConfigDir;

#[test]
fn config_file_drives_tier_policy() {
    let dir = ConfigDir::new();
    let path = dir.write(
        "task-digest.toml",
        r#"
timezone = "+09:00"

[tiers]
overdue = true
windows = [2, 5, 14]
urgent_hours = [12]

[source]
max_lookahead_days = 14
"#,
    );

    let cfg = Config::discover(Some(&path), dir.path()).expect("load");
    let policy = TierPolicy::from(&cfg.tiers);
    assert_eq!(
        policy.tiers(),
        vec![
            UrgencyTier::Overdue,
            UrgencyTier::DueToday,
            UrgencyTier::DueWithin(2),
            UrgencyTier::DueWithin(5),
            UrgencyTier::DueWithin(14),
        ]
    );
    assert_eq!(cfg.utc_offset().expect("offset").local_minus_utc(), 9 * 3600);
    assert_eq!(cfg.tiers.urgent_hours, vec![12]);
}

#[test]
fn property_names_can_be_renamed() {
    let cfg = Config::parse(
        r#"
[source.properties]
title = "Task"
type = "Kind"
notify_days = "Notify Days"
"#,
    )
    .expect("parse");
    assert_eq!(cfg.source.properties.title, "Task");
    assert_eq!(cfg.source.properties.task_type, "Kind");
    assert_eq!(cfg.source.properties.notify_days, "Notify Days");
    assert_eq!(cfg.source.properties.due, "Due");
}

#[test]
fn malformed_toml_is_a_config_error() {
    let dir = ConfigDir::new();
    let path = dir.write("broken.toml", "[tiers\nwindows = [3");
    let err = Config::discover(Some(&path), dir.path()).expect_err("broken");
    assert!(matches!(err, Error::TomlParse(_)));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn validation_errors_name_the_key() {
    let cases = [
        ("[format]\nmemo_max_chars = 0", "format.memo_max_chars"),
        ("[format]\ndetail_max_chars = 3\nellipsis = \"...\"", "format.detail_max_chars"),
        ("[source]\npage_size = 101", "source.page_size"),
        ("[source]\nstatuses = []", "source.statuses"),
        ("[tiers]\nurgent_hours = [24]", "tiers.urgent_hours"),
        ("[sink]\ntimeout_secs = 0", "sink.timeout_secs"),
        ("[tiers]\nwindows = [3, 4000000000]", "tiers.windows"),
        ("[tiers]\nwindows = [3, 7]", "tiers.windows"),
        ("[source]\nmax_lookahead_days = 4294967295", "source.max_lookahead_days"),
    ];
    for (content, key) in cases {
        let err = Config::parse(content).expect_err(content);
        assert!(
            err.to_string().contains(key),
            "{content:?} -> {err} should mention {key}"
        );
    }
}

#[test]
fn preview_needs_only_source_credentials() {
    let creds = SourceCredentials::resolve(Some("secret".to_string()), Some("db".to_string()))
        .expect("resolve");
    assert_eq!(creds.database_id, "db");

    let err = Credentials::resolve(
        Some("secret".to_string()),
        Some("db".to_string()),
        None,
        Some("   ".to_string()),
    )
    .expect_err("missing slack settings");
    match err {
        Error::MissingSetting(names) => {
            assert_eq!(names, vec!["SLACK_BOT_TOKEN", "SLACK_CHANNEL_ID"])
        }
        other => panic!("unexpected error: {other}"),
    }
}
