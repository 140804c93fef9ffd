//! cmdflow: run shell command lines from Rust and consume their output as
//! results, events or streams.
//!
//! ```no_run
//! # async fn demo() -> cmdflow::Result<()> {
//! let shell = cmdflow::Shell::new();
//! let file = "my notes.txt";
//! let result = shell.run(cmdflow::cmd!("cat {} | head -n 3", file)).await?;
//! println!("{}", result.stdout);
//! # Ok(())
//! # }
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod logger;
pub mod quote;
pub mod runner;
pub mod shell;
pub mod stream;
pub mod utils;

pub use commands::{CommandContext, CommandOutput, CommandRegistry, Handler, Registration, Yielder};
pub use config::{Config, ShellSettings, load_config};
pub use error::{Error, Result};
pub use quote::{Arg, CommandSpec, quote};
pub use runner::{
    CancelToken, Captured, CommandResult, Phase, ProcessRunner, RunOptions, Signal, StdinOption,
    StdinWriter, Supervisor,
};
pub use shell::{Shell, ShellBuilder};
pub use stream::{ChunkKind, ChunkStream, ChunkStreamExt, StreamChunk, TaggedChunk, merge};
