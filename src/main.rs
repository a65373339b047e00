use argh::FromArgs;
use ferrous_cst::debug::DebugLevel;
use ferrous_cst::{earley, grammar, lexer, tree};
use std::ffi::OsString;
use std::io::Read;
use std::process::ExitCode;

#[derive(FromArgs)]
/// Lex, parse and build a concrete syntax tree for a source file.
struct Args {
    #[argh(positional)]
    /// source file to parse; reads from stdin when omitted
    path: Option<OsString>,

    /// debug verbosity: off, basic, detailed, trace (default: off)
    #[argh(option, default = "default_debug_level()")]
    debug_level: String,

    /// only emit debug output for this input position
    #[argh(option)]
    debug_pos: Option<usize>,
}

fn default_debug_level() -> String {
    "off".to_string()
}

fn main() -> ExitCode {
    env_logger::init();
    let args: Args = argh::from_env();

    match run(&args) {
        Ok(rendered) => {
            println!("{rendered}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("Exception: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<String, String> {
    let level = DebugLevel::from_str(&args.debug_level)?;
    ferrous_cst::debug::set_debug_config(ferrous_cst::debug::DebugConfig {
        level,
        position_filter: args.debug_pos,
        failure_only: false,
    });

    let source = read_source(args.path.as_ref()).map_err(|e| e.to_string())?;

    let tokens = lexer::lex(&source).map_err(|e| e.to_string())?;
    let filtered: Vec<_> = tokens.into_iter().filter(|t| !t.is_trivia()).collect();

    let surface = grammar::surface_grammar();
    let (chart, accepts) = earley::build_chart(&filtered, &surface);
    if !accepts {
        return Err(earley::ParseError::NotAccepted.to_string());
    }

    let (arena, root) = tree::build_tree(&chart, &filtered, &surface).map_err(|e| e.to_string())?;
    Ok(tree::render(&arena, root))
}

fn read_source(path: Option<&OsString>) -> std::io::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}
