mod config;
mod demo_host;

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use comexe_blobstore::Value;
use comexe_runtime::{create_instance, join, run_application, Application};
use demo_host::{install_globals, DemoHost};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Build-identifying text shared by `--comexe-version` and the in-script
/// `runtime.version()` global. See `SPEC_FULL.md` §6.
const VERSION_BANNER: &str = concat!("comexe ", env!("CARGO_PKG_VERSION"));

/// Stand-in for the embedded archive entry `comexe/init.lua` real builds
/// would read at startup (`SPEC_FULL.md` §4.L). Reading an actual archive
/// format is an out-of-scope leaf collaborator; this crate only needs a
/// non-empty blob to exercise the "startup script present" bootstrap path.
const STARTUP_SCRIPT: &[u8] = b"-- comexe demo bootstrap\n";

fn main() -> ExitCode {
    let mut argv = env::args().skip(1);
    let mut config_path = PathBuf::from("comexe.toml");
    let mut forwarded_args = Vec::new();

    for arg in &mut argv {
        if arg == "--comexe-version" {
            print!("{VERSION_BANNER}");
            return ExitCode::SUCCESS;
        }
        if let Some(path) = arg.strip_prefix("--config=") {
            config_path = PathBuf::from(path);
            continue;
        }
        // Every other flag is not a CLI concern of ours: it is forwarded
        // verbatim into the host's `arg` global, exactly as a script-level
        // argument vector, never validated or rejected here.
        forwarded_args.push(arg);
    }

    let config = match config::Config::load(&config_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("comexe: {err}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.log_filter);

    if STARTUP_SCRIPT.is_empty() {
        error!("startup script missing; exiting with code 5");
        return ExitCode::from(5);
    }

    let app = Application::with_registry_capacity(
        config.registry_initial_capacity,
        config.event_buffer_slots,
        config.event_buffer_bytes,
        STARTUP_SCRIPT.to_vec(),
        forwarded_args,
    );

    let version = VERSION_BANNER.to_string();
    let main_offset = create_instance(&app, None, "main", None, move |app, instance| {
        let mut host = DemoHost::new(version.clone());
        install_globals(&mut host, Arc::clone(&app), Arc::clone(&instance), version.clone());
        host.register_global("greet", |args| {
            if let Some(Value::String(bytes)) = args.first() {
                println!("{}", String::from_utf8_lossy(bytes));
            }
            Ok(None)
        });
        app.post(instance.offset(), "greet", &[Value::String(b"hi".to_vec())]);
        comexe_runtime::EventLoop::new(&instance).run_once(&mut host);
    });

    if let Err(err) = join(&app, main_offset) {
        error!(error = %err, "failed to join main instance");
        return ExitCode::FAILURE;
    }

    match run_application(&app) {
        Ok(report) => {
            info!("\n{report}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "run_application failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(log_filter: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(env_filter).with_writer(std::io::stderr).try_init();
}
