//! Interactive read-eval-print loop

use crate::interp::{Interpreter, Value};
use crate::parser::parse;
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result as RlResult};
use std::path::PathBuf;

const PROMPT: &str = ">> ";
const HISTORY_FILE: &str = ".dusk_history";

/// REPL state: the line editor plus one interpreter session, so bindings and
/// logs persist across inputs.
pub struct Repl {
    editor: DefaultEditor,
    interpreter: Interpreter,
    history_path: Option<PathBuf>,
}

impl Repl {
    /// Create a new REPL
    pub fn new() -> RlResult<Self> {
        let editor = DefaultEditor::new()?;
        let interpreter = Interpreter::new();

        let history_path = dirs_home().map(|h| h.join(HISTORY_FILE));

        let mut repl = Repl {
            editor,
            interpreter,
            history_path,
        };

        if let Some(ref path) = repl.history_path {
            let _ = repl.editor.load_history(path);
        }

        Ok(repl)
    }

    /// Run the REPL until EOF or `:quit`
    pub fn run(&mut self) -> RlResult<()> {
        println!("Dusk REPL");
        println!("Type :help for help, :quit to exit.\n");

        loop {
            match self.editor.readline(PROMPT) {
                Ok(line) => {
                    let line = line.trim();

                    if line.is_empty() {
                        continue;
                    }

                    let _ = self.editor.add_history_entry(line);

                    if line.starts_with(':') {
                        if self.handle_command(line) {
                            break;
                        }
                        continue;
                    }

                    self.eval_input(line);
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("Goodbye!");
                    break;
                }
                Err(err) => {
                    eprintln!("Error: {err}");
                    break;
                }
            }
        }

        if let Some(ref path) = self.history_path {
            let _ = self.editor.save_history(path);
        }

        Ok(())
    }

    /// Handle REPL commands (starting with :)
    fn handle_command(&mut self, cmd: &str) -> bool {
        match cmd {
            ":quit" | ":q" | ":exit" => {
                println!("Goodbye!");
                true
            }
            ":help" | ":h" | ":?" => {
                self.print_help();
                false
            }
            ":clear" => {
                print!("\x1B[2J\x1B[1;1H");
                false
            }
            _ => {
                println!("Unknown command: {cmd}");
                println!("Type :help for help.");
                false
            }
        }
    }

    fn print_help(&self) {
        println!("Dusk REPL Commands:");
        println!("  :help, :h, :?   Show this help");
        println!("  :quit, :q       Exit the REPL");
        println!("  :clear          Clear the screen");
        println!();
        println!("You can enter:");
        println!("  - Expressions: 1 + 2, \"a\" + \"b\", [1, 2][0]");
        println!("  - Bindings: let x = 5; const k = 1;");
        println!("  - Functions: let add = fun(a, b): {{ a + b }};");
        println!("  - Loops: for i, v in [10, 20]: {{ logs(i, v); }}");
        println!();
        println!("Built-in functions:");
        println!("  logs(...)       Append a line to the session log");
        println!("  length(x)       Length of an array or string");
        println!("  range(a, b)     Array of integers a..b");
        println!("  typeof(x)       Type name of a value");
        println!("  copy(x)         Deep copy of an array or hash");
    }

    /// Parse and evaluate one input line against the session environment.
    fn eval_input(&mut self, input: &str) {
        let (program, errors) = parse(input);
        if let Some(err) = errors.first() {
            eprintln!("Parse error: {err}");
            return;
        }

        match self.interpreter.run(&program) {
            Ok(value) => {
                for line in self.interpreter.drain_logs() {
                    println!("{line}");
                }
                if value != Value::Null {
                    println!("{value}");
                }
            }
            Err(err) => {
                // Logs emitted before the failure still surface
                for line in self.interpreter.drain_logs() {
                    println!("{line}");
                }
                eprintln!("Runtime error: {err}");
            }
        }
    }
}

impl Default for Repl {
    fn default() -> Self {
        match Self::new() {
            Ok(repl) => repl,
            Err(err) => panic!("Failed to create REPL: {err}"),
        }
    }
}

/// Get home directory
fn dirs_home() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        std::env::var("USERPROFILE").ok().map(PathBuf::from)
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOME").ok().map(PathBuf::from)
    }
}
