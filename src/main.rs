mod commands;
mod core;
mod pack;
mod release;
mod ui;
mod utils;

use clap::{Args, Parser, Subcommand};
use commands::BuildFlags;
use crate::core::context::RunContext;
use crate::core::error::{PackError, print_error};
use std::path::PathBuf;

/// Package asset bundles into encrypted releases, committed as real blobs
#[derive(Parser)]
#[command(name = "payload")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct Cli {
  /// Raise log verbosity (-v info, -vv debug); RUST_LOG overrides
  #[arg(short, long, global = true, action = clap::ArgAction::Count)]
  verbose: u8,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Build one encrypted bundle from every matching file under the source root
  Bundle {
    /// Source root
    #[arg(short, long, default_value = "data/js")]
    src: PathBuf,
    /// Output directory (default: the source root)
    #[arg(short, long)]
    dest: Option<PathBuf>,
    /// Bundle name (default from payload.toml, "app")
    #[arg(short = 'o', long)]
    name: Option<String>,
    #[command(flatten)]
    build: BuildArgs,
  },

  /// Build one encrypted bundle per `<name>_<n>` frame group
  Groups {
    /// Source root
    #[arg(short, long, default_value = "data/js")]
    src: PathBuf,
    /// Output directory (default: the source root)
    #[arg(short, long)]
    dest: Option<PathBuf>,
    /// Prefix prepended to every group's bundle name
    #[arg(long)]
    prefix: Option<String>,
    #[command(flatten)]
    build: BuildArgs,
  },

  /// Decrypt an artifact; no archive, manifest or publish work
  Decrypt {
    /// Encrypted artifact
    #[arg(short, long)]
    input: PathBuf,
    /// Where to write the decrypted archive
    #[arg(short = 'O', long)]
    output: PathBuf,
    /// Passphrase (prefer --passphrase-file or the environment)
    #[arg(short = 'k', long)]
    passphrase: Option<String>,
    /// Read the passphrase from the first line of a file
    #[arg(long)]
    passphrase_file: Option<PathBuf>,
    /// openssl cipher name (default from payload.toml, "aes-256-cbc")
    #[arg(long)]
    cipher: Option<String>,
  },
}

/// Options shared by `bundle` and `groups`
#[derive(Args)]
struct BuildArgs {
  /// Passphrase (prefer --passphrase-file or the environment)
  #[arg(short = 'k', long)]
  passphrase: Option<String>,
  /// Read the passphrase from the first line of a file
  #[arg(long)]
  passphrase_file: Option<PathBuf>,
  /// openssl cipher name (default from payload.toml, "aes-256-cbc")
  #[arg(long)]
  cipher: Option<String>,
  /// Keep the intermediate <bundle>.zip
  #[arg(long)]
  keep: bool,
  /// Build artifacts only; no commit or push
  #[arg(long)]
  no_publish: bool,
  /// Bump appVersion/modelVersion in this JSON descriptor before building
  #[arg(long, value_name = "PATH")]
  bump_appboot: Option<PathBuf>,
  /// Print the run summary as JSON
  #[arg(long)]
  json: bool,
}

impl BuildArgs {
  fn into_flags(self) -> (Option<String>, BuildFlags) {
    (
      self.cipher,
      BuildFlags {
        passphrase: self.passphrase,
        passphrase_file: self.passphrase_file,
        keep: self.keep,
        no_publish: self.no_publish,
        bump_appboot: self.bump_appboot,
        json: self.json,
      },
    )
  }
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn main() {
  let cli = Cli::parse();
  crate::core::logging::init(cli.verbose);

  // .env feeds the environment passphrase provider
  if let Err(e) = dotenvy::dotenv()
    && !e.not_found()
  {
    tracing::warn!(error = %e, "ignoring unreadable .env");
  }

  let cwd = match std::env::current_dir() {
    Ok(dir) => dir,
    Err(e) => handle_error(PackError::from(e).context("Failed to get current directory")),
  };

  let mut ctx = match RunContext::build(&cwd) {
    Ok(ctx) => ctx,
    Err(e) => handle_error(e),
  };

  let result = match cli.command {
    Commands::Bundle { src, dest, name, build } => {
      let (cipher, flags) = build.into_flags();
      ctx
        .config
        .override_cipher(cipher.as_deref())
        .and_then(|()| commands::run_bundle(&ctx, src, dest, name, flags))
    }
    Commands::Groups {
      src,
      dest,
      prefix,
      build,
    } => {
      let (cipher, flags) = build.into_flags();
      ctx
        .config
        .override_cipher(cipher.as_deref())
        .and_then(|()| commands::run_groups(&ctx, src, dest, prefix, flags))
    }
    Commands::Decrypt {
      input,
      output,
      passphrase,
      passphrase_file,
      cipher,
    } => ctx
      .config
      .override_cipher(cipher.as_deref())
      .and_then(|()| commands::run_decrypt(&ctx, input, output, passphrase, passphrase_file)),
  };

  if let Err(err) = result {
    handle_error(err);
  }
}

fn handle_error(err: PackError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
