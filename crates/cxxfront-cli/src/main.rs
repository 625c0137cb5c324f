//! Driver binary: read a preprocessed C++ source file, parse it, and
//! either dump the AST or report the first error as an annotated snippet.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser as ClapParser, ValueEnum};
use serde::Serialize;

use cxxfront_core::SharedInterner;
use cxxfront_parser::ast::AstDumper;
use cxxfront_parser::{
    CompileOptions, Error, LongModel, ManglingStyle, parse_source, render_error,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DumpFormat {
    Ast,
    Json,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MangleArg {
    Msvc,
    Itanium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LongModelArg {
    Lp64,
    Llp64,
}

#[derive(ClapParser, Debug)]
#[command(name = "cxxfront", about = "C++20 front-end core", version)]
struct Args {
    /// Preprocessed C++ source file.
    input: PathBuf,

    /// What to print on success.
    #[arg(long, value_enum, default_value_t = DumpFormat::Ast)]
    dump: DumpFormat,

    #[arg(long, value_enum, default_value_t = MangleArg::Itanium)]
    mangling: MangleArg,

    /// Target pointer width in bits.
    #[arg(long, default_value_t = 64)]
    pointer_bits: u32,

    #[arg(long, value_enum, default_value_t = LongModelArg::Lp64)]
    long_model: LongModelArg,

    /// Default struct packing in bytes when no #pragma pack is active.
    #[arg(long, default_value_t = 8)]
    default_pack: u32,

    /// Raise a debugger trap when parsing reaches this source line.
    #[arg(long)]
    debug_break_line: Option<u32>,
}

/// Machine-readable parse summary for `--dump json`.
#[derive(Serialize)]
struct Summary {
    top_level_declarations: usize,
    arena_nodes: usize,
    registered_types: usize,
    instantiations: usize,
    warnings: Vec<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let source = match std::fs::read_to_string(&args.input) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: cannot read {}: {err}", args.input.display());
            return ExitCode::FAILURE;
        }
    };

    let options = CompileOptions {
        mangling_style: match args.mangling {
            MangleArg::Msvc => ManglingStyle::Msvc,
            MangleArg::Itanium => ManglingStyle::Itanium,
        },
        target_pointer_bits: args.pointer_bits,
        target_long_model: match args.long_model {
            LongModelArg::Lp64 => LongModel::Lp64,
            LongModelArg::Llp64 => LongModel::Llp64,
        },
        default_pack: args.default_pack,
        debug_break_line: args.debug_break_line,
    };

    let interner = SharedInterner::new();
    let path = args.input.display().to_string();

    let tu = match parse_source(&source, &interner, options) {
        Ok(tu) => tu,
        Err(Error::Parse(err)) => {
            eprintln!("{}", render_error(&source, &path, &err, &interner));
            return ExitCode::FAILURE;
        }
        Err(Error::Lex(err)) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    for warning in &tu.warnings {
        eprintln!("warning: {} at {}", warning.message, warning.token.pos);
    }

    match args.dump {
        DumpFormat::Ast => {
            let dumper = AstDumper::new(&tu.arena, &tu.types, &tu.interner);
            print!("{}", dumper.dump(&tu.roots));
        }
        DumpFormat::Json => {
            let summary = Summary {
                top_level_declarations: tu.roots.len(),
                arena_nodes: tu.arena.len(),
                registered_types: tu.types.len(),
                instantiations: tu.instantiations().count(),
                warnings: tu.warnings.iter().map(|w| w.message.clone()).collect(),
            };
            match serde_json::to_string_pretty(&summary) {
                Ok(json) => println!("{json}"),
                Err(err) => {
                    eprintln!("error: cannot serialize summary: {err}");
                    return ExitCode::FAILURE;
                }
            }
        }
        DumpFormat::None => {}
    }

    ExitCode::SUCCESS
}
