use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use embervm::{Config, Runtime};

/// Launches a class file on the embervm runtime: resolves the classpath,
/// loads the named main class, and runs its `main(String[])`.
#[derive(Debug, Parser)]
#[command(name = "embervm", version, about)]
struct Cli {
	/// Classpath entries (directories or `.jar`/`.zip` archives), joined
	/// with the host path separator (`:` on Unix, `;` on Windows).
	#[arg(short = 'c', long = "classpath", visible_alias = "cp")]
	classpath: Option<String>,

	/// Native shared libraries to map before running, searched in order for
	/// `ACC_NATIVE` method symbols.
	#[arg(short = 'l', long = "library")]
	libraries: Vec<PathBuf>,

	/// Binary name of the class to run (`com/example/Main`, `/`-separated).
	main_class: String,

	/// Arguments passed through to the guest `main(String[])`.
	args: Vec<String>,
}

fn main() -> ExitCode {
	tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

	match run() {
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => {
			eprintln!("embervm: {err:?}");
			ExitCode::FAILURE
		}
	}
}

fn run() -> anyhow::Result<()> {
	let cli = Cli::parse();

	let mut config = Config::new(cli.main_class.clone(), cli.args.clone());
	if let Some(classpath) = &cli.classpath {
		config = config.with_classpath(classpath);
	}

	let runtime = Runtime::boot(config).map_err(|fault| anyhow!(fault.to_string())).context("failed to boot runtime")?;

	for library in &cli.libraries {
		runtime
			.load_native_library(library)
			.map_err(|fault| anyhow!(fault.to_string()))
			.with_context(|| format!("failed to load native library {}", library.display()))?;
	}

	runtime.run_main().map_err(|thrown| anyhow!(thrown.to_string())).with_context(|| format!("uncaught exception in {}", cli.main_class))
}
