mod cmd;
mod output;
mod prompts;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd::{BuildArgs, ExeArgs};
use output::{OutputFormat, print_error};

/// artisan - build, seal and run deployment packages
#[derive(Parser)]
#[command(name = "art")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Build a package from a local path or git URL
  Build {
    /// Local path or git URL to build from
    #[arg(default_value = ".")]
    from: String,

    /// Package name, [domain/]group/name[:tag]
    #[arg(short = 't', long = "name")]
    name: String,

    /// Profile to run (default: the default profile, else the first)
    #[arg(short, long)]
    profile: Option<String>,

    /// Sub directory holding the build manifest
    #[arg(long)]
    path: Option<String>,

    /// Token for cloning private repositories
    #[arg(long)]
    token: Option<String>,

    /// Copy the source into an isolated directory before building
    #[arg(long)]
    copy: bool,

    /// Package this path directly, without a build manifest
    #[arg(long)]
    target: Option<String>,

    /// Prompt for missing inputs
    #[arg(short, long)]
    interactive: bool,

    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },

  /// Run a function from a build manifest on disk
  Run {
    function: String,

    /// Directory holding the build manifest (default: current directory)
    path: Option<String>,

    /// Prompt for missing inputs
    #[arg(short, long)]
    interactive: bool,

    /// Extra environment variables, KEY=VALUE
    #[arg(short, long = "env")]
    env: Vec<String>,
  },

  /// Execute an exported function from a package
  Exe {
    name: String,
    function: String,

    /// Registry credentials, user:password
    #[arg(short = 'u', long)]
    creds: Option<String>,

    /// Prompt for missing inputs
    #[arg(short, long)]
    interactive: bool,

    /// Directory to extract the package into
    #[arg(long)]
    path: Option<PathBuf>,

    /// Keep the extracted files after execution
    #[arg(long)]
    preserve_files: bool,

    /// Refuse packages without a verifiable signature
    #[arg(long)]
    require_signature: bool,

    /// Extra environment variables, KEY=VALUE
    #[arg(short, long = "env")]
    env: Vec<String>,
  },

  /// List packages in the local registry
  Ls {
    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },

  /// Remove packages from the local registry
  Rm {
    #[arg(required = true)]
    names: Vec<String>,

    /// Skip confirmation
    #[arg(short, long)]
    force: bool,
  },

  /// Add another name for an existing package
  Tag { source: String, target: String },

  /// Verify a package and extract its files
  Open {
    name: String,
    dest: PathBuf,

    #[arg(short = 'u', long)]
    creds: Option<String>,

    #[arg(long)]
    require_signature: bool,
  },

  /// Export packages as a single tar stream
  Export {
    #[arg(required = true)]
    names: Vec<String>,

    /// Destination path or http(s) URI
    #[arg(short, long)]
    dest: String,

    #[arg(short = 'u', long)]
    creds: Option<String>,
  },

  /// Import packages from exported tar streams
  Import {
    #[arg(required = true)]
    uris: Vec<String>,

    #[arg(short = 'u', long)]
    creds: Option<String>,
  },

  /// Generate a signing key pair
  Keygen {
    /// Scope the key to a package group
    #[arg(short, long)]
    group: Option<String>,

    /// Scope the key to a single package (requires --group)
    #[arg(short, long)]
    name: Option<String>,

    /// Overwrite an existing key pair
    #[arg(short, long)]
    force: bool,
  },

  /// Show configuration, or details of a package
  Info {
    name: Option<String>,

    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let filter = if cli.verbose {
    EnvFilter::new("debug")
  } else {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
  };
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .without_time()
    .with_writer(std::io::stderr)
    .init();

  match run(cli.command) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      print_error(&format!("{e:#}"));
      ExitCode::FAILURE
    }
  }
}

fn run(command: Commands) -> Result<()> {
  match command {
    Commands::Build {
      from,
      name,
      profile,
      path,
      token,
      copy,
      target,
      interactive,
      output,
    } => cmd::cmd_build(
      BuildArgs {
        from,
        name,
        profile,
        sub_path: path,
        token,
        copy,
        target,
        interactive,
      },
      output,
    ),
    Commands::Run {
      function,
      path,
      interactive,
      env,
    } => cmd::cmd_run(&function, path.as_deref(), interactive, &env),
    Commands::Exe {
      name,
      function,
      creds,
      interactive,
      path,
      preserve_files,
      require_signature,
      env,
    } => cmd::cmd_exe(ExeArgs {
      name,
      function,
      credentials: creds,
      interactive,
      path,
      preserve_files,
      require_signature,
      env,
    }),
    Commands::Ls { output } => cmd::cmd_ls(output),
    Commands::Rm { names, force } => cmd::cmd_rm(&names, force),
    Commands::Tag { source, target } => cmd::cmd_tag(&source, &target),
    Commands::Open {
      name,
      dest,
      creds,
      require_signature,
    } => cmd::cmd_open(&name, &dest, creds.as_deref(), require_signature),
    Commands::Export { names, dest, creds } => cmd::cmd_export(&names, &dest, creds.as_deref()),
    Commands::Import { uris, creds } => cmd::cmd_import(&uris, creds.as_deref()),
    Commands::Keygen { group, name, force } => cmd::cmd_keygen(group, name, force),
    Commands::Info { name, output } => cmd::cmd_info(name.as_deref(), output),
  }
}
