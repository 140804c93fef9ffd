pub mod common;
pub mod env;
pub mod flow;
pub mod fs;
pub mod io;

#[cfg(test)]
mod tests;

use crate::commands::{CommandRegistry, Handler};

/// Seeds `registry` with every built-in utility.
pub fn register_all(registry: &mut CommandRegistry) {
    // Env/Navigation
    let _ = registry.register("cd", Handler::call(env::cd::CdCommand));
    let _ = registry.register("pwd", Handler::call(env::pwd::PwdCommand));
    let _ = registry.register("env", Handler::call(env::printenv::EnvCommand));
    let _ = registry.register("exit", Handler::call(env::exit::ExitCommand));
    let _ = registry.register("which", Handler::call(env::which::WhichCommand));

    // FS
    let _ = registry.register("ls", Handler::call(fs::ls::LsCommand));
    let _ = registry.register("cp", Handler::call(fs::cp::CpCommand));
    let _ = registry.register("mv", Handler::call(fs::mv::MvCommand));
    let _ = registry.register("rm", Handler::call(fs::rm::RmCommand));
    let _ = registry.register("mkdir", Handler::call(fs::mkdir::MkdirCommand));
    let _ = registry.register("touch", Handler::call(fs::touch::TouchCommand));
    let _ = registry.register("basename", Handler::call(fs::path::BasenameCommand));
    let _ = registry.register("dirname", Handler::call(fs::path::DirnameCommand));

    // IO
    let _ = registry.register("echo", Handler::call(io::echo::EchoCommand));
    let _ = registry.register("cat", Handler::call(io::cat::CatCommand));
    let _ = registry.register("head", Handler::call(io::lines::HeadCommand));
    let _ = registry.register("tail", Handler::call(io::lines::TailCommand));
    let _ = registry.register("seq", Handler::call(io::seq::SeqCommand));
    let _ = registry.register("yes", Handler::generator(io::yes::YesCommand));

    // Flow
    let _ = registry.register("true", Handler::call(flow::status::TrueCommand));
    let _ = registry.register("false", Handler::call(flow::status::FalseCommand));
    let _ = registry.register("test", Handler::call(flow::test::TestCommand));
    let _ = registry.register("[", Handler::call(flow::test::TestCommand));
    let _ = registry.register("sleep", Handler::call(flow::sleep::SleepCommand));
}
