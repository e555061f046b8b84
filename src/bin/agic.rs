// agic - AGI Logic Compiler
// Compiles logic source files to AGI logic resources

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use agic::logic_compiler::config::CompilerConfig;
use agic::logic_compiler::LogicCompiler;

fn main() {
    // Initialize logging
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage(&args[0]);
        process::exit(1);
    }

    let mut input_file = "";
    let mut output_file = String::new();
    let mut config_file: Option<PathBuf> = None;
    let mut defines: Vec<(String, String)> = Vec::new();
    let mut include_paths: Vec<PathBuf> = Vec::new();
    let mut dictionary: Option<PathBuf> = None;
    let mut items: Option<PathBuf> = None;
    let mut commands: Option<PathBuf> = None;
    let mut words_output: Option<PathBuf> = None;
    let mut verbose = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-o" | "--output" => {
                output_file = option_value(&args, i, "a filename").to_string();
                i += 2;
            }
            "-D" => {
                let definition = option_value(&args, i, "NAME[=VALUE]");
                let (name, value) = definition.split_once('=').unwrap_or((definition, "1"));
                defines.push((name.to_string(), value.to_string()));
                i += 2;
            }
            "-I" => {
                include_paths.push(PathBuf::from(option_value(&args, i, "a directory")));
                i += 2;
            }
            "--dictionary" => {
                dictionary = Some(PathBuf::from(option_value(&args, i, "a filename")));
                i += 2;
            }
            "--items" => {
                items = Some(PathBuf::from(option_value(&args, i, "a filename")));
                i += 2;
            }
            "--commands" => {
                commands = Some(PathBuf::from(option_value(&args, i, "a filename")));
                i += 2;
            }
            "--words-out" => {
                words_output = Some(PathBuf::from(option_value(&args, i, "a filename")));
                i += 2;
            }
            "--config" => {
                config_file = Some(PathBuf::from(option_value(&args, i, "a filename")));
                i += 2;
            }
            "-v" | "--verbose" => {
                verbose = true;
                i += 1;
            }
            "-h" | "--help" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            arg if arg.starts_with('-') => {
                eprintln!("Error: Unknown option '{}'", arg);
                print_usage(&args[0]);
                process::exit(1);
            }
            _ => {
                if input_file.is_empty() {
                    input_file = &args[i];
                } else {
                    eprintln!("Error: Multiple input files specified");
                    process::exit(1);
                }
                i += 1;
            }
        }
    }

    if input_file.is_empty() {
        eprintln!("Error: No input file specified");
        print_usage(&args[0]);
        process::exit(1);
    }

    // Command-line options override the configuration file
    let mut config = match &config_file {
        Some(path) => CompilerConfig::load(path).unwrap_or_else(|err| {
            eprintln!("Error: {}", err);
            process::exit(1);
        }),
        None => CompilerConfig::default(),
    };
    for (name, value) in &defines {
        config.define(name, value);
    }
    config.include_paths.extend(include_paths);
    config.dictionary = dictionary.or(config.dictionary);
    config.items = items.or(config.items);
    config.commands = commands.or(config.commands);
    config.words_output = words_output.or(config.words_output);

    if output_file.is_empty() {
        // Generate output filename from input
        let input_path = Path::new(input_file);
        let base_name = input_path.file_stem().unwrap_or_else(|| {
            eprintln!("Error: Invalid input filename");
            process::exit(1);
        });
        output_file = format!("{}.agl", base_name.to_string_lossy());
    }

    if verbose {
        println!("Compiling {} -> {}", input_file, output_file);
    }

    let compiler = LogicCompiler::with_config(&config).unwrap_or_else(|err| {
        eprintln!("Error: {}", err);
        process::exit(1);
    });

    // Compile
    let compiled = match compiler.compile_file(Path::new(input_file)) {
        Ok(compiled) => compiled,
        Err(err) => {
            eprintln!("Compilation error: {}", err);
            process::exit(1);
        }
    };

    let resource = compiled.to_bytes().unwrap_or_else(|err| {
        eprintln!("Compilation error: {}", err);
        process::exit(1);
    });
    if let Err(err) = fs::write(&output_file, &resource) {
        eprintln!("Error writing '{}': {}", output_file, err);
        process::exit(1);
    }

    if let Some(path) = &config.words_output {
        if let Err(err) = fs::write(path, &compiled.words) {
            eprintln!("Error writing '{}': {}", path.display(), err);
            process::exit(1);
        }
        if verbose {
            println!("Wrote {} byte word dictionary to {}", compiled.words.len(), path.display());
        }
    }

    if verbose {
        println!(
            "Successfully compiled {} bytes of code ({} bytes total) to {}",
            compiled.code.len(),
            resource.len(),
            output_file
        );
    }
}

fn option_value<'a>(args: &'a [String], i: usize, what: &str) -> &'a str {
    match args.get(i + 1) {
        Some(value) => value,
        None => {
            eprintln!("Error: {} requires {}", args[i], what);
            process::exit(1);
        }
    }
}

fn print_usage(program_name: &str) {
    println!("Usage: {} [options] <input>", program_name);
    println!();
    println!("Options:");
    println!("  -o, --output <file>    Output filename (default: input.agl)");
    println!("  -D NAME[=VALUE]        Predefine a macro (value defaults to 1)");
    println!("  -I <dir>               Add an include search directory");
    println!("  --dictionary <file>    Word list (\"<code> <word>\" per line)");
    println!("  --items <file>         Inventory item list (\"<code>:<name>\" per line)");
    println!("  --commands <file>      TOML command table replacing the built-in one");
    println!("  --words-out <file>     Write the front-coded word dictionary");
    println!("  --config <file>        TOML configuration file");
    println!("  -v, --verbose          Verbose output");
    println!("  -h, --help             Show this help message");
}
