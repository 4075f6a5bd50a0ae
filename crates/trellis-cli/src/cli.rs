use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "trellis")]
#[command(about = "Workspaces, projects and pages from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// CLI profile name (Supabase project, session and selections)
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Sign in, inspect or end the session for a profile
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Manage workspaces
    #[command(alias = "ws")]
    Workspace {
        #[command(subcommand)]
        command: WorkspaceCommands,
    },
    /// Manage projects in the selected workspace
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
    /// Manage folders and pages in the selected project
    Node {
        #[command(subcommand)]
        command: NodeCommands,
    },
    /// Show the activity feed
    Activity {
        #[command(subcommand)]
        command: ActivityCommands,
    },
    /// Overview of the selected workspace and project
    Dashboard,
    /// Show a single page
    Page {
        #[command(subcommand)]
        command: PageCommands,
    },
    /// Browse or add to the local media shelf
    Media {
        #[command(subcommand)]
        command: MediaCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum NodeType {
    Folder,
    Page,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update profile config
    Init {
        /// Profile name to initialize
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Supabase project URL
        #[arg(long, value_name = "URL")]
        supabase_url: Option<String>,
        /// Supabase anon/public key
        #[arg(long, value_name = "KEY")]
        supabase_anon_key: Option<String>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Sign in with email/password and store the session in the keychain
    Login {
        /// Account email
        #[arg(long, value_name = "EMAIL")]
        email: String,
        /// Account password
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Show auth and lockout status for the profile
    Status,
    /// Sign out and clear the stored session
    Logout,
    /// Keep the session fresh in the background until interrupted
    Watch,
}

#[derive(Subcommand)]
pub enum WorkspaceCommands {
    /// List workspaces you are a member of
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a workspace and select it
    Create {
        /// Workspace name
        name: Vec<String>,
    },
    /// Select the workspace used by project commands
    Select {
        /// Workspace ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// List projects in the selected workspace
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a project visible only to you
    Create {
        /// Project name
        name: Vec<String>,
    },
    /// Select the project used by node commands
    Select {
        /// Project ID
        id: String,
    },
    /// Delete a project
    Delete {
        /// Project ID
        id: String,
    },
    /// Restrict a project to the given user IDs
    Access {
        /// Project ID
        id: String,
        /// Allowed user IDs
        #[arg(required = true)]
        users: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum NodeCommands {
    /// List folders and pages
    List {
        /// Project ID (defaults to the selected project)
        #[arg(long, value_name = "ID")]
        project: Option<String>,
        /// Only show children of this folder
        #[arg(long, value_name = "ID", conflicts_with = "all")]
        folder: Option<String>,
        /// Show every node regardless of folder
        #[arg(long)]
        all: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a folder or page to the selected project
    Add {
        /// Node name
        #[arg(long)]
        name: String,
        /// Node type
        #[arg(long = "type", value_enum, default_value_t = NodeType::Page)]
        kind: NodeType,
        /// Parent folder ID
        #[arg(long, value_name = "ID")]
        parent: Option<String>,
    },
    /// Update a node
    Update {
        /// Node ID
        id: String,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// JSON object merged into the page data
        #[arg(long, value_name = "JSON")]
        data: Option<String>,
        /// Due date (YYYY-MM-DD)
        #[arg(long, value_name = "DATE", conflicts_with = "clear_due_date")]
        due_date: Option<NaiveDate>,
        /// Remove the due date
        #[arg(long)]
        clear_due_date: bool,
    },
    /// Assign or unassign a user on a page
    Assign {
        /// Node ID
        id: String,
        /// Assignee user ID
        #[arg(long, value_name = "USER")]
        user: String,
        /// Remove the assignment instead
        #[arg(long)]
        remove: bool,
    },
    /// Delete a node
    Delete {
        /// Node ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum ActivityCommands {
    /// Show the newest activity entries
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum PageCommands {
    /// Show a page with its data
    Show {
        /// Page ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum MediaCommands {
    /// List media items
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add an item to the shelf
    Add {
        /// File name shown on the shelf
        name: Vec<String>,
        /// Image or file URL
        #[arg(long, value_name = "URL")]
        url: String,
        /// Date (YYYY-MM-DD, defaults to today)
        #[arg(long, value_name = "DATE")]
        date: Option<NaiveDate>,
    },
}
