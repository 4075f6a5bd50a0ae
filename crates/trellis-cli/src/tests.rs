use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use clap::Parser;
use pretty_assertions::assert_eq;
use serde_json::json;
use trellis_core::models::DataMap;
use trellis_core::{Activity, Node, NodeKind, Project, RowId, Workspace};

use crate::cli::{Cli, Commands, CompletionShell, MediaCommands, NodeCommands, NodeType};
use crate::commands::common::{
    format_activity_lines, format_media_lines, format_node_lines, format_project_lines,
    format_relative_time, format_workspace_lines, normalize_identifier, normalize_name,
};
use crate::commands::completions::{render_completions, run_completions};
use crate::commands::config::{apply_profile_settings, missing_fields};
use crate::commands::dashboard::summarize;
use crate::commands::media::{load_shelf, new_media_item, save_shelf};
use crate::commands::node::parse_data_patch;
use crate::config_profiles::{CliProfile, CliProfilesConfig};
use crate::error::CliError;

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, hour, minute, 0).unwrap()
}

fn node(id: &str, kind: NodeKind, due_date: Option<NaiveDate>) -> Node {
    Node {
        id: RowId::from(id),
        project_id: RowId::from("p1"),
        parent_id: None,
        name: format!("node {id}"),
        kind,
        data: DataMap::new(),
        assignees: Vec::new(),
        due_date,
        created_at: None,
        updated_at: None,
    }
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
}

#[test]
fn format_relative_time_units() {
    let now = at(12, 0);
    assert_eq!(format_relative_time(now - Duration::seconds(30), now), "just now");
    assert_eq!(format_relative_time(now - Duration::minutes(2), now), "2m ago");
    assert_eq!(format_relative_time(now - Duration::hours(2), now), "2h ago");
    assert_eq!(format_relative_time(now - Duration::days(3), now), "3d ago");
    assert_eq!(format_relative_time(now - Duration::days(15), now), "2w ago");
    assert_eq!(format_relative_time(now - Duration::days(400), now), "1y ago");
}

#[test]
fn format_relative_time_clamps_future_timestamps() {
    let now = at(12, 0);
    assert_eq!(format_relative_time(now + Duration::hours(1), now), "just now");
}

#[test]
fn normalize_name_joins_and_trims_parts() {
    let parts = vec!["  Product".to_string(), "Launch  ".to_string()];
    assert_eq!(normalize_name(&parts, "Name").unwrap(), "Product Launch");
}

#[test]
fn normalize_name_rejects_blank_input() {
    let error = normalize_name(&[" ".to_string()], "Workspace name").unwrap_err();
    assert!(matches!(error, CliError::EmptyArgument("Workspace name")));
    assert_eq!(error.to_string(), "Workspace name must not be empty");
}

#[test]
fn normalize_identifier_trims_whitespace() {
    assert_eq!(
        normalize_identifier(" 42 ", "Node ID").unwrap(),
        RowId::from("42")
    );
    assert!(matches!(
        normalize_identifier("   ", "Node ID"),
        Err(CliError::EmptyArgument("Node ID"))
    ));
}

#[test]
fn parse_data_patch_accepts_objects_only() {
    let patch = parse_data_patch(r#"{"status":"done","points":3}"#).unwrap();
    assert_eq!(patch.get("status"), Some(&json!("done")));
    assert_eq!(patch.get("points"), Some(&json!(3)));

    assert!(matches!(parse_data_patch("[1,2]"), Err(CliError::InvalidData)));
    assert!(matches!(
        parse_data_patch("{not json"),
        Err(CliError::Serialization(_))
    ));
}

#[test]
fn apply_profile_settings_prefers_flags_over_environment() {
    let mut config = CliProfilesConfig::default();
    apply_profile_settings(
        &mut config,
        "default",
        Some("https://flag.supabase.co".to_string()),
        None,
        |key| match key {
            "SUPABASE_URL" => Some("https://env.supabase.co".to_string()),
            "SUPABASE_ANON_KEY" => Some("env-key".to_string()),
            _ => None,
        },
    )
    .unwrap();

    let profile = config.profile("default").unwrap();
    assert_eq!(
        profile.supabase_url.as_deref(),
        Some("https://flag.supabase.co")
    );
    assert_eq!(profile.supabase_anon_key.as_deref(), Some("env-key"));
    assert!(missing_fields(profile).is_empty());
}

#[test]
fn apply_profile_settings_keeps_existing_values() {
    let mut config = CliProfilesConfig::default();
    config.profiles.insert(
        "work".to_string(),
        CliProfile {
            supabase_url: Some("https://work.supabase.co".to_string()),
            supabase_anon_key: Some("work-key".to_string()),
            selected_workspace_id: Some(RowId::from("w1")),
            selected_project_id: Some(RowId::from("p1")),
        },
    );

    apply_profile_settings(&mut config, "work", None, None, |_| None).unwrap();

    let profile = config.profile("work").unwrap();
    assert_eq!(profile.supabase_anon_key.as_deref(), Some("work-key"));
    assert_eq!(profile.selected_project_id, Some(RowId::from("p1")));
}

#[test]
fn apply_profile_settings_rejects_invalid_url_without_writing() {
    let mut config = CliProfilesConfig::default();
    let result = apply_profile_settings(
        &mut config,
        "default",
        Some("demo.supabase.co".to_string()),
        Some("anon".to_string()),
        |_| None,
    );

    assert!(matches!(result, Err(CliError::Config(_))));
    assert!(config.profile("default").is_none());
}

#[test]
fn missing_fields_lists_unset_values() {
    let profile = CliProfile {
        supabase_url: Some("https://project.supabase.co".to_string()),
        ..CliProfile::default()
    };
    assert_eq!(missing_fields(&profile), vec!["supabase_anon_key"]);
    assert_eq!(
        missing_fields(&CliProfile::default()),
        vec!["supabase_url", "supabase_anon_key"]
    );
}

#[test]
fn workspace_lines_mark_the_selection() {
    let workspaces = vec![
        Workspace {
            id: RowId::from("1"),
            name: "Acme".to_string(),
            owner_id: None,
            created_at: None,
        },
        Workspace {
            id: RowId::from("2"),
            name: "Side".to_string(),
            owner_id: None,
            created_at: None,
        },
    ];

    let lines = format_workspace_lines(&workspaces, Some(&RowId::from("2")));
    assert!(lines[0].starts_with("  1"));
    assert!(lines[1].starts_with("* 2"));
    assert!(lines[1].ends_with("Side"));
}

#[test]
fn project_lines_describe_access() {
    let projects = vec![
        Project {
            id: RowId::from("10"),
            name: "Open".to_string(),
            workspace_id: RowId::from("1"),
            allowed_user_ids: None,
            created_at: None,
        },
        Project {
            id: RowId::from("11"),
            name: "Private".to_string(),
            workspace_id: RowId::from("1"),
            allowed_user_ids: Some(vec!["u1".to_string(), "u2".to_string()]),
            created_at: None,
        },
    ];

    let lines = format_project_lines(&projects, None);
    assert!(lines[0].ends_with("everyone"));
    assert!(lines[1].ends_with("2 user(s)"));
}

#[test]
fn node_lines_include_kind_and_due_date() {
    let mut page = node("7", NodeKind::Page, Some(date(20)));
    page.updated_at = Some(at(11, 0));
    let folder = node("8", NodeKind::Folder, None);

    let lines = format_node_lines(&[&page, &folder], at(12, 0));
    assert!(lines[0].contains("page"));
    assert!(lines[0].contains("due 2026-03-20"));
    assert!(lines[0].ends_with("1h ago"));
    assert!(lines[1].contains("folder"));
    assert!(!lines[1].contains("due"));
}

#[test]
fn activity_lines_fall_back_to_user_id() {
    let activities = vec![Activity {
        id: RowId::from("1"),
        project_id: None,
        user_id: Some("u1".to_string()),
        user_name: None,
        action: "assigned".to_string(),
        node_id: Some(RowId::from("7")),
        node_name: Some("Roadmap".to_string()),
        timestamp: at(11, 55),
        details: Some("Assigned to bob".to_string()),
    }];

    let lines = format_activity_lines(&activities, at(12, 0));
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("5m ago"));
    assert!(lines[0].contains("u1 assigned Roadmap"));
    assert!(lines[0].ends_with("(Assigned to bob)"));
}

#[test]
fn summarize_counts_nodes_and_orders_upcoming_pages() {
    let nodes = vec![
        node("1", NodeKind::Folder, None),
        node("2", NodeKind::Page, Some(date(10))),
        node("3", NodeKind::Page, Some(date(25))),
        node("4", NodeKind::Page, Some(date(15))),
        node("5", NodeKind::Page, None),
    ];

    let summary = summarize(&nodes, date(14));
    assert_eq!(summary.folders, 1);
    assert_eq!(summary.pages, 4);
    assert_eq!(summary.overdue, 1);
    let upcoming: Vec<&str> = summary
        .upcoming
        .iter()
        .map(|node| node.id.as_str())
        .collect();
    assert_eq!(upcoming, vec!["4", "3"]);
}

#[test]
fn cli_parses_node_add_with_type_and_parent() {
    let cli = Cli::try_parse_from([
        "trellis", "node", "add", "--name", "Specs", "--type", "folder", "--parent", "3",
    ])
    .unwrap();

    let Some(Commands::Node {
        command: NodeCommands::Add { name, kind, parent },
    }) = cli.command
    else {
        panic!("expected node add");
    };
    assert_eq!(name, "Specs");
    assert_eq!(kind, NodeType::Folder);
    assert_eq!(parent.as_deref(), Some("3"));
}

#[test]
fn cli_accepts_global_profile_after_subcommand() {
    let cli = Cli::try_parse_from(["trellis", "dashboard", "--profile", "work"]).unwrap();
    assert_eq!(cli.profile.as_deref(), Some("work"));
    assert!(matches!(cli.command, Some(Commands::Dashboard)));
}

#[test]
fn cli_rejects_conflicting_due_date_flags() {
    let result = Cli::try_parse_from([
        "trellis",
        "node",
        "update",
        "5",
        "--due-date",
        "2026-04-01",
        "--clear-due-date",
    ]);
    assert!(result.is_err());
}

#[test]
fn cli_requires_users_for_project_access() {
    assert!(Cli::try_parse_from(["trellis", "project", "access", "10"]).is_err());
    assert!(Cli::try_parse_from(["trellis", "project", "access", "10", "u1", "u2"]).is_ok());
}

#[test]
fn completions_use_trellis_binary_name() {
    let script = String::from_utf8(render_completions(CompletionShell::Bash)).unwrap();
    assert!(script.contains("trellis"));
    assert!(script.contains("workspace"));
}

#[test]
fn completions_write_to_output_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trellis.fish");

    run_completions(CompletionShell::Fish, Some(&path)).unwrap();

    let script = std::fs::read_to_string(&path).unwrap();
    assert!(script.contains("complete -c trellis"));
}

#[test]
fn missing_media_shelf_starts_with_starter_items() {
    let dir = tempfile::tempdir().unwrap();
    let shelf = load_shelf(&dir.path().join("media-default.json")).unwrap();

    let names: Vec<&str> = shelf.items().iter().map(|item| item.name.as_str()).collect();
    assert_eq!(names, vec!["mountain.jpg", "beach.png"]);
}

#[test]
fn added_media_survives_a_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("media-work.json");
    let mut shelf = load_shelf(&path).unwrap();

    let item = new_media_item(
        &shelf,
        &["  team".to_string(), "photo.jpg ".to_string()],
        " https://cdn.example.com/team.jpg ",
        date(14),
    )
    .unwrap();
    shelf.add_media(item);
    save_shelf(&path, &shelf).unwrap();

    let reloaded = load_shelf(&path).unwrap();
    assert_eq!(reloaded.items().len(), 3);
    let added = reloaded.find(&RowId::from("3")).unwrap();
    assert_eq!(added.name, "team photo.jpg");
    assert_eq!(added.url, "https://cdn.example.com/team.jpg");
    assert_eq!(added.date, date(14));

    let lines = format_media_lines(reloaded.items());
    assert!(lines[2].contains("2026-03-14"));
    assert!(lines[2].ends_with("https://cdn.example.com/team.jpg"));
}

#[test]
fn media_item_requires_name_and_http_url() {
    let shelf = trellis_core::stores::MediaStore::new();
    assert!(matches!(
        new_media_item(&shelf, &[" ".to_string()], "https://cdn.example.com/a.png", date(1)),
        Err(CliError::EmptyArgument("Media name"))
    ));
    assert!(matches!(
        new_media_item(&shelf, &["a.png".to_string()], "cdn.example.com/a.png", date(1)),
        Err(CliError::InvalidMediaUrl(_))
    ));
}

#[test]
fn cli_parses_media_add_with_date() {
    let cli = Cli::try_parse_from([
        "trellis", "media", "add", "logo.svg", "--url", "https://cdn.example.com/logo.svg",
        "--date", "2026-03-01",
    ])
    .unwrap();

    let Some(Commands::Media {
        command: MediaCommands::Add { name, url, date: added },
    }) = cli.command
    else {
        panic!("expected media add");
    };
    assert_eq!(name, vec!["logo.svg".to_string()]);
    assert_eq!(url, "https://cdn.example.com/logo.svg");
    assert_eq!(added, Some(date(1)));
}
