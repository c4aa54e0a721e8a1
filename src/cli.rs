use clap::Parser;

fn get_version() -> &'static str {
    const BASE_VERSION: &str = env!("CARGO_PKG_VERSION");

    // If there's a git tag at HEAD, use just the tag (release build)
    if let Some(tag) = option_env!("PINYARN_GIT_TAG") {
        return tag;
    }

    // Not on a tag - include commit hash and branch (dev build)
    let commit = option_env!("PINYARN_GIT_COMMIT").unwrap_or("unknown");
    let branch = option_env!("PINYARN_GIT_BRANCH").unwrap_or("unknown");

    // Leaking the formatted string gives a 'static str; this happens once at startup
    let version = format!("v{}-{} ({})", BASE_VERSION, commit, branch);
    Box::leak(version.into_boxed_str())
}

#[derive(Parser)]
#[command(name = "pinyarn")]
#[command(about = "Pin exact Yarn binary and plugin URLs for reproducible builds")]
#[command(version = get_version())]
#[command(
    after_help = "Supported Yarn version formats:\n  \
- exact version: 0.14.1 or 2.1.1 or ...\n  \
- latest stable: 1 or classic - latest stable Yarn classic version; 2 or berry - latest stable Yarn 2 version\n  \
- Yarn 2 pull request number: 1030 or 1031 or ..., the head commit at the PR will be pinned\n  \
- Yarn 2 commit sha or branch name: 95af161 or master or ...\n\n\
If no version is provided pinyarn determines the Yarn version in use and pins that."
)]
pub struct Cli {
    /// Yarn version to pin (omit to detect from the installed yarn)
    #[arg(id = "yarn-version", value_name = "VERSION")]
    pub version: Option<String>,

    /// Increase verbosity (use multiple times for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Reduce output to errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,
}
