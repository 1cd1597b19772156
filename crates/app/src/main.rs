use std::fmt;
use std::io::{self, BufRead, Write};

use clap::{Parser, Subcommand};
use quiz_core::model::{
    Answer, CategoryId, DiscSlot, DiscTrait, Question, QuizId, QuizResult, QuizType,
    TaxonomyError,
};
use services::{
    Clock, QuizPhase, QuizSession, QuizSessionLoop, SessionError, ValidationError,
};
use storage::{CacheConfig, ClientConfig, DEFAULT_BASE_URL, QuizRepository, Storage};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(name = "quiz", about = "Take MBTI and DISC personality quizzes")]
struct Cli {
    /// Base url of the quiz API.
    #[clap(long, env = "QUIZ_API_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Bearer token sent with every request.
    #[clap(long, env = "QUIZ_API_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List quiz categories.
    Categories,
    /// List the quizzes of a category.
    Quizzes {
        #[clap(value_parser, value_name = "CATEGORY_ID")]
        category_id: CategoryId,
    },
    /// List the questions of a quiz, in order.
    Questions {
        #[clap(value_parser, value_name = "QUIZ_ID")]
        quiz_id: QuizId,
    },
    /// Take a quiz interactively.
    Take {
        #[clap(value_parser, value_name = "mbti|disc")]
        quiz_type: QuizType,
    },
}

//
// ─── INPUT ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug)]
enum InputError {
    Empty,
    NoSuchOption { raw: String, count: usize },
    MissingSlot(String),
    Disc(TaxonomyError),
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::Empty => write!(f, "nothing entered"),
            InputError::NoSuchOption { raw, count } => {
                write!(f, "{raw:?} is not an option number between 1 and {count}")
            }
            InputError::MissingSlot(raw) => {
                write!(f, "{raw:?} needs a + (most) or - (least) prefix")
            }
            InputError::Disc(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for InputError {}

impl From<TaxonomyError> for InputError {
    fn from(err: TaxonomyError) -> Self {
        InputError::Disc(err)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Previous,
    Next,
    Submit,
    Quit,
    Choice(usize),
    Disc(Vec<(DiscTrait, DiscSlot)>),
}

/// Parses one line typed at the quiz prompt.
///
/// MBTI questions take a 1-based option number. DISC sets take one or more
/// `+X`/`-X` tokens placing trait `X` on the most or least side.
fn parse_input(line: &str, question: &Question) -> Result<Input, InputError> {
    let line = line.trim();
    match line.to_ascii_lowercase().as_str() {
        "" => return Err(InputError::Empty),
        "p" | "prev" => return Ok(Input::Previous),
        "n" | "next" => return Ok(Input::Next),
        "s" | "submit" => return Ok(Input::Submit),
        "q" | "quit" => return Ok(Input::Quit),
        _ => {}
    }

    match question {
        Question::Mbti(q) => {
            let count = q.options.len();
            line.parse::<usize>()
                .ok()
                .filter(|n| (1..=count).contains(n))
                .map(|n| Input::Choice(n - 1))
                .ok_or_else(|| InputError::NoSuchOption {
                    raw: line.to_string(),
                    count,
                })
        }
        Question::Disc(_) => line
            .split_whitespace()
            .map(|token| {
                let mut chars = token.chars();
                let slot = chars
                    .next()
                    .filter(|c| matches!(c, '+' | '-'))
                    .ok_or_else(|| InputError::MissingSlot(token.to_string()))?;
                let slot: DiscSlot = slot.to_string().parse()?;
                let disc_trait: DiscTrait = chars.as_str().parse()?;
                Ok((disc_trait, slot))
            })
            .collect::<Result<Vec<_>, InputError>>()
            .map(Input::Disc),
    }
}

//
// ─── RENDERING ─────────────────────────────────────────────────────────────────
//

fn render_question(session: &QuizSession) {
    let Some(question) = session.current_question() else {
        return;
    };
    let progress = session.progress();
    println!();
    println!(
        "[{}/{}] {} ({} answered)",
        progress.current_index + 1,
        progress.total,
        question.content(),
        progress.answered
    );

    match (question, session.answer(question.id())) {
        (Question::Mbti(q), answer) => {
            let chosen = match answer {
                Some(Answer::Mbti(text)) => Some(text.as_str()),
                _ => None,
            };
            for (n, option) in q.options.iter().enumerate() {
                let mark = if chosen == Some(option.text.as_str()) { "*" } else { " " };
                println!(" {mark} {}. {}", n + 1, option.text);
            }
        }
        (Question::Disc(q), answer) => {
            let pair = match answer {
                Some(Answer::Disc(pair)) => Some(pair),
                _ => None,
            };
            for option in &q.options {
                let mark = match pair {
                    Some(p) if p.most() == Some(option.disc_trait) => "+",
                    Some(p) if p.least() == Some(option.disc_trait) => "-",
                    _ => " ",
                };
                println!(" {mark} {}: {}", option.disc_trait, option.text);
            }
        }
    }
}

fn render_result(result: &QuizResult) {
    println!();
    println!("{} result: {}", result.quiz_type, result.personality_code);
    if !result.description.is_empty() {
        println!("{}", result.description);
    }
    if let Some(scores) = &result.scores {
        for (dimension, score) in scores {
            println!("  {dimension}: {score:.1}");
        }
    }
}

fn prompt(lines: &mut impl Iterator<Item = io::Result<String>>) -> io::Result<Option<String>> {
    print!("> ");
    io::stdout().flush()?;
    lines.next().transpose()
}

/// Index of the question a refused submission should send the user back to.
fn question_to_revisit(session: &QuizSession, err: &ValidationError) -> Option<usize> {
    let target = match err {
        ValidationError::Incomplete { missing } => missing.first().copied(),
        ValidationError::UnmatchedOption(id) => Some(*id),
        _ => None,
    }?;
    session.questions().iter().position(|q| q.id() == target)
}

//
// ─── COMMANDS ──────────────────────────────────────────────────────────────────
//

async fn take(
    runner: &QuizSessionLoop,
    quiz_type: QuizType,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = runner.start(quiz_type).await?;
    println!(
        "{} ({} questions). Commands: p(rev), n(ext), s(ubmit), q(uit).",
        session.quiz().title,
        session.questions().len()
    );
    if quiz_type == QuizType::Disc {
        println!("Mark traits with +X for most and -X for least, e.g. \"+D -S\".");
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    while session.phase() == QuizPhase::Quiz {
        render_question(&session);
        let Some(line) = prompt(&mut lines)? else {
            return Ok(());
        };
        let Some(question) = session.current_question().cloned() else {
            break;
        };
        let input = match parse_input(&line, &question) {
            Ok(input) => input,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };

        match input {
            Input::Previous => {
                session.previous();
            }
            Input::Next => {
                session.next();
            }
            Input::Quit => return Ok(()),
            Input::Choice(index) => {
                if let Question::Mbti(q) = &question {
                    match session.record_choice(question.id(), q.options[index].text.clone()) {
                        Ok(_) => {
                            session.next();
                        }
                        Err(SessionError::Validation(err)) => println!("{err}"),
                        Err(err) => return Err(err.into()),
                    }
                }
            }
            Input::Disc(marks) => {
                for (disc_trait, slot) in marks {
                    match session.record_disc(question.id(), disc_trait, slot) {
                        Ok(_) => {}
                        Err(SessionError::Validation(err)) => {
                            println!("{err}");
                            break;
                        }
                        Err(err) => return Err(err.into()),
                    }
                }
                if session.is_answered(session.current_index()) {
                    session.next();
                }
            }
            Input::Submit => match runner.submit(&mut session).await {
                Ok(result) => render_result(&result),
                Err(SessionError::Validation(err)) => {
                    println!("{err}");
                    if let Some(index) = question_to_revisit(&session, &err) {
                        session.go_to(index);
                    }
                }
                Err(err @ SessionError::Submission(_)) => {
                    println!("{err}; your answers are kept, submit again to retry");
                }
                Err(err) => return Err(err.into()),
            },
        }
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = ClientConfig::new(&cli.base_url, cli.token)?;
    debug!(base_url = %config.base_url, authenticated = config.token.is_some(), "quiz api configured");
    let clock = Clock::system();
    let storage = Storage::http(config, clock, CacheConfig::default());

    match cli.command {
        Command::Categories => {
            let categories = storage.quizzes.list_categories().await?;
            println!("{}", serde_json::to_string_pretty(&categories)?);
        }
        Command::Quizzes { category_id } => {
            let quizzes = storage.quizzes.list_quizzes_for_category(category_id).await?;
            println!("{}", serde_json::to_string_pretty(&quizzes)?);
        }
        Command::Questions { quiz_id } => {
            let questions = storage.quizzes.list_questions(quiz_id).await?;
            println!("{}", serde_json::to_string_pretty(&questions)?);
        }
        Command::Take { quiz_type } => {
            let runner = QuizSessionLoop::from_storage(clock, &storage);
            take(&runner, quiz_type).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
