use std::fmt::Display;
use std::io::{self, BufRead, Write};

use anyhow::Result;

use crate::data::model::Interval;
use crate::error::InputError;

// ---------------------------------------------------------------------------
// Console
// ---------------------------------------------------------------------------

/// Prompt/reply channel. Generic so tests can script a whole session.
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Console { input, output }
    }

    pub fn say(&mut self, message: impl Display) -> io::Result<()> {
        writeln!(self.output, "{message}")
    }

    pub fn rule(&mut self, ch: char) -> io::Result<()> {
        writeln!(self.output, "{}", ch.to_string().repeat(60))
    }

    /// Show `prompt` and read one line. `None` at end of input.
    pub fn ask(&mut self, prompt: &str) -> io::Result<Option<String>> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.output)?;
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Ask and parse. A rejected reply is reported and yields `None`, the
    /// same as end of input.
    pub fn ask_parsed<T, E: Display>(
        &mut self,
        prompt: &str,
        parse: impl FnOnce(&str) -> Result<T, E>,
    ) -> io::Result<Option<T>> {
        let Some(reply) = self.ask(prompt)? else {
            return Ok(None);
        };
        match parse(&reply) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                self.say(format!("{e}. Back to command page."))?;
                Ok(None)
            }
        }
    }

    pub fn ask_yes_no(&mut self, prompt: &str) -> io::Result<Option<bool>> {
        self.ask_parsed(prompt, |reply| match parse_answer(reply) {
            Some(answer) => Ok(answer == Answer::Yes),
            None => Err(format!("{reply}: Not a valid entry")),
        })
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

// ---------------------------------------------------------------------------
// Reply parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
}

/// Yes/no vocabulary, including boolean-like tokens.
pub fn parse_answer(reply: &str) -> Option<Answer> {
    match reply {
        "y" | "Y" | "yes" | "Yes" | "YES" | "true" | "True" | "1" => Some(Answer::Yes),
        "n" | "N" | "no" | "No" | "NO" | "false" | "False" | "0" => Some(Answer::No),
        _ => None,
    }
}

/// A finite number. `inf` and `nan` parse as `f64` but are rejected.
fn parse_number(token: &str) -> Result<f64, InputError> {
    let token = token.trim();
    match token.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(InputError::NotANumber(token.to_string())),
    }
}

/// Two comma-separated numbers, optionally wrapped in brackets.
pub fn parse_pair(reply: &str) -> Result<(f64, f64), InputError> {
    let inner = reply
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']');
    let parts: Vec<&str> = inner.split(',').collect();
    let [a, b] = parts.as_slice() else {
        return Err(InputError::NotAPair(reply.to_string()));
    };
    Ok((parse_number(a)?, parse_number(b)?))
}

/// Axis limits: a pair whose first value is below the second.
pub fn parse_limits(reply: &str) -> Result<Interval, InputError> {
    let (lo, hi) = parse_pair(reply)?;
    if lo >= hi {
        return Err(InputError::Inverted { lo, hi });
    }
    Ok(Interval::new(lo, hi))
}

/// A single number.
pub fn parse_float(reply: &str) -> Result<f64, InputError> {
    parse_number(reply)
}

// ---------------------------------------------------------------------------
// Command loop
// ---------------------------------------------------------------------------

/// One row of a command table.
pub struct CommandSpec<C> {
    pub keywords: &'static [&'static str],
    pub summary: &'static str,
    pub command: C,
}

/// Whether the loop keeps going after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// An interactive parameter loop: a command table plus how to render and
/// execute.
pub trait ParameterLoop {
    type Command: Copy + 'static;

    fn title(&self) -> &'static str;

    fn commands(&self) -> &'static [CommandSpec<Self::Command>];

    /// Command run when input ends.
    fn quit_command(&self) -> Self::Command;

    /// Regenerate the figure; called before every prompt.
    fn render<R: BufRead, W: Write>(&mut self, console: &mut Console<R, W>) -> Result<()>;

    fn execute<R: BufRead, W: Write>(
        &mut self,
        command: Self::Command,
        console: &mut Console<R, W>,
    ) -> Result<Flow>;
}

/// Look a typed word up in a command table.
pub fn lookup<C: Copy>(table: &[CommandSpec<C>], word: &str) -> Option<C> {
    table
        .iter()
        .find(|spec| spec.keywords.contains(&word))
        .map(|spec| spec.command)
}

/// Print the command reference of `lp`.
pub fn print_commands<L, R, W>(lp: &L, console: &mut Console<R, W>) -> io::Result<()>
where
    L: ParameterLoop,
    R: BufRead,
    W: Write,
{
    console.rule('-')?;
    console.say(lp.title())?;
    console.rule('-')?;
    console.say(format!("{:<15}: {}", "commands", "displays list of all command options"))?;
    for spec in lp.commands() {
        console.say(format!("{:<15}: {}", spec.keywords.join(","), spec.summary))?;
    }
    console.rule('-')
}

/// Run `lp` until a command returns [`Flow::Quit`] or input ends.
///
/// Every iteration renders first, then reads one command. `commands` prints
/// the reference; unknown words are reported and change nothing.
pub fn run_loop<L, R, W>(lp: &mut L, console: &mut Console<R, W>) -> Result<()>
where
    L: ParameterLoop,
    R: BufRead,
    W: Write,
{
    print_commands(&*lp, console)?;
    loop {
        lp.render(console)?;
        let Some(word) = console.ask("Enter a command: ")? else {
            let quit = lp.quit_command();
            lp.execute(quit, console)?;
            return Ok(());
        };
        if word == "commands" {
            print_commands(&*lp, console)?;
            continue;
        }
        match lookup(lp.commands(), &word) {
            Some(command) => {
                if lp.execute(command, console)? == Flow::Quit {
                    return Ok(());
                }
            }
            None => {
                log::debug!("unknown command '{word}'");
                console.say(format!("{word}: unknown command, type 'commands' for the list"))?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn yes_no_vocabulary() {
        for y in ["y", "Y", "yes", "YES", "True", "1"] {
            assert_eq!(parse_answer(y), Some(Answer::Yes), "{y}");
        }
        for n in ["n", "N", "no", "NO", "False", "0"] {
            assert_eq!(parse_answer(n), Some(Answer::No), "{n}");
        }
        assert_eq!(parse_answer("maybe"), None);
    }

    #[test]
    fn pairs_and_limits() {
        assert_eq!(parse_pair("1200, 1600"), Ok((1200.0, 1600.0)));
        assert_eq!(parse_pair("[1300,1320]"), Ok((1300.0, 1320.0)));
        assert_eq!(parse_pair("1200"), Err(InputError::NotAPair("1200".into())));
        assert_eq!(parse_pair("1,2,3"), Err(InputError::NotAPair("1,2,3".into())));
        assert_eq!(parse_pair("a,2"), Err(InputError::NotANumber("a".into())));
        assert_eq!(
            parse_limits("5,1"),
            Err(InputError::Inverted { lo: 5.0, hi: 1.0 })
        );
        assert_eq!(parse_limits("0,2.5"), Ok(Interval::new(0.0, 2.5)));
    }

    #[test]
    fn non_finite_numbers_are_rejected() {
        assert_eq!(parse_limits("-inf,inf"), Err(InputError::NotANumber("-inf".into())));
        assert_eq!(parse_limits("nan,5"), Err(InputError::NotANumber("nan".into())));
        assert_eq!(parse_pair("1300, NaN"), Err(InputError::NotANumber("NaN".into())));
        assert_eq!(parse_float("infinity"), Err(InputError::NotANumber("infinity".into())));
        assert_eq!(parse_float(" 2.5 "), Ok(2.5));
    }

    #[test]
    fn console_reads_lines_until_eof() {
        let mut console = Console::new(Cursor::new("first\n  second  \n"), Vec::new());
        assert_eq!(console.ask("> ").unwrap().as_deref(), Some("first"));
        assert_eq!(console.ask("> ").unwrap().as_deref(), Some("second"));
        assert_eq!(console.ask("> ").unwrap(), None);
    }

    #[test]
    fn rejected_replies_are_reported() {
        let mut console = Console::new(Cursor::new("perhaps\nyes\n3,1\n"), Vec::new());
        assert_eq!(console.ask_yes_no("? ").unwrap(), None);
        assert_eq!(console.ask_yes_no("? ").unwrap(), Some(true));
        assert_eq!(console.ask_parsed("? ", parse_limits).unwrap(), None);
        let out = String::from_utf8(console.into_output()).unwrap();
        assert!(out.contains("perhaps: Not a valid entry. Back to command page."));
        assert!(out.contains("lower limit 3 must be below upper limit 1"));
    }

    #[derive(Clone, Copy, Debug, PartialEq)]
    enum Cmd {
        Bump,
        Quit,
    }

    const TABLE: &[CommandSpec<Cmd>] = &[
        CommandSpec { keywords: &["bump"], summary: "add one", command: Cmd::Bump },
        CommandSpec { keywords: &["q", "Q"], summary: "quit", command: Cmd::Quit },
    ];

    #[derive(Default)]
    struct Counter {
        renders: usize,
        value: usize,
        quits: usize,
    }

    impl ParameterLoop for Counter {
        type Command = Cmd;

        fn title(&self) -> &'static str {
            "Counter"
        }

        fn commands(&self) -> &'static [CommandSpec<Cmd>] {
            TABLE
        }

        fn quit_command(&self) -> Cmd {
            Cmd::Quit
        }

        fn render<R: BufRead, W: Write>(&mut self, _console: &mut Console<R, W>) -> Result<()> {
            self.renders += 1;
            Ok(())
        }

        fn execute<R: BufRead, W: Write>(
            &mut self,
            command: Cmd,
            _console: &mut Console<R, W>,
        ) -> Result<Flow> {
            match command {
                Cmd::Bump => {
                    self.value += 1;
                    Ok(Flow::Continue)
                }
                Cmd::Quit => {
                    self.quits += 1;
                    Ok(Flow::Quit)
                }
            }
        }
    }

    #[test]
    fn loop_dispatches_until_quit() {
        let mut counter = Counter::default();
        let mut console = Console::new(Cursor::new("bump\nwhat\ncommands\nbump\nQ\nbump\n"), Vec::new());
        run_loop(&mut counter, &mut console).unwrap();
        assert_eq!(counter.value, 2);
        assert_eq!(counter.quits, 1);
        assert_eq!(counter.renders, 5);
        let out = String::from_utf8(console.into_output()).unwrap();
        assert!(out.contains("what: unknown command"));
        assert!(out.contains("q,Q"));
    }

    #[test]
    fn end_of_input_quits() {
        let mut counter = Counter::default();
        let mut console = Console::new(Cursor::new("bump\n"), Vec::new());
        run_loop(&mut counter, &mut console).unwrap();
        assert_eq!(counter.value, 1);
        assert_eq!(counter.quits, 1);
    }
}
