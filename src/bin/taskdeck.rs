//! A console front end for taskdeck
//!
//! When `TASKDECK_CONFIG` points to a backend configuration file, tasks and accounts are handled by the hosted
//! backend it describes. Otherwise, everything is kept in local files (see `TASKDECK_DATA`).

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Duration, Local, NaiveDate, NaiveTime};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::watch;

use taskdeck::auth::rest_auth::RestAuth;
use taskdeck::config::BackendConfig;
use taskdeck::controller::system_clock;
use taskdeck::store::rest_store::RestStore;
use taskdeck::traits::{AuthProvider, RemoteStore};
use taskdeck::utils;
use taskdeck::{Category, ControllerHandle, GateState, Intent, MemoryAuth, MemoryStore, Priority, Registration, SessionGate, TaskDraft};

const CONFIG_VAR: &str = "TASKDECK_CONFIG";
const DATA_VAR: &str = "TASKDECK_DATA";
const DEFAULT_DATA_FILE: &str = "taskdeck.json";

type Input = Lines<BufReader<Stdin>>;
type CommandResult = Result<Flow, Box<dyn Error>>;

enum Flow {
    Continue,
    Quit,
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let (auth, store) = match backends() {
        Ok(backends) => backends,
        Err(err) => {
            eprintln!("Unable to set up the backend: {}", err);
            std::process::exit(1);
        }
    };
    let gate = SessionGate::start(auth, store, system_clock());
    tokio::spawn(print_boards(gate.state()));

    print_help();
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    loop {
        utils::prompt("> ");
        let line = match input.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                log::error!("Unable to read the console: {}", err);
                break;
            }
        };

        match run_command(&gate, &line, &mut input).await {
            Ok(Flow::Continue) => (),
            Ok(Flow::Quit) => break,
            Err(err) => println!("Error: {}", err),
        }
    }
}

fn backends() -> Result<(Arc<dyn AuthProvider>, Arc<dyn RemoteStore>), Box<dyn Error>> {
    if let Ok(config_path) = std::env::var(CONFIG_VAR) {
        let config = BackendConfig::from_file(Path::new(&config_path))?;
        let auth: Arc<dyn AuthProvider> = Arc::new(RestAuth::new(&config)?);
        let store: Arc<dyn RemoteStore> = Arc::new(RestStore::new(&config, Arc::clone(&auth)));
        log::info!("Using the backend at {}", config.database_url);
        return Ok((auth, store));
    }

    let data_path = PathBuf::from(std::env::var(DATA_VAR).unwrap_or_else(|_| DEFAULT_DATA_FILE.to_string()));
    let accounts_path = data_path.with_extension("accounts.json");
    log::info!("Working offline, with data in {:?}", data_path);

    let store = match MemoryStore::from_file(&data_path) {
        Ok(store) => store,
        Err(err) => {
            log::warn!("Invalid data file: {}. Starting with no data", err);
            MemoryStore::new_with_file(&data_path)
        }
    };
    let auth = match MemoryAuth::from_file(&accounts_path) {
        Ok(auth) => auth,
        Err(err) => {
            log::warn!("Invalid accounts file: {}. Starting with no accounts", err);
            MemoryAuth::new_with_file(&accounts_path)
        }
    };
    let auth: Arc<dyn AuthProvider> = Arc::new(auth);
    let store: Arc<dyn RemoteStore> = Arc::new(store);
    Ok((auth, store))
}

/// Print the board of the signed-in user every time it changes
async fn print_boards(mut state: watch::Receiver<GateState>) {
    loop {
        let current = state.borrow_and_update().clone();
        let handle = match current.handle() {
            None => {
                if state.changed().await.is_err() {
                    return;
                }
                continue;
            },
            Some(handle) => handle.clone(),
        };

        let mut board = handle.board();
        loop {
            tokio::select! {
                changed = board.changed() => {
                    if changed.is_err() {
                        break;
                    }
                },
                changed = state.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    break;
                },
            }
            println!();
            utils::print_board(&board.borrow_and_update());
        }
    }
}

async fn run_command(gate: &SessionGate, line: &str, input: &mut Input) -> CommandResult {
    let line = line.trim();
    let (command, args) = match line.split_once(char::is_whitespace) {
        Some((command, args)) => (command, args.trim()),
        None => (line, ""),
    };

    match command {
        "" => (),
        "help" => print_help(),
        "quit" | "exit" => return Ok(Flow::Quit),
        "register" => {
            let words = expect_words(args, 3, "register <email> <password> <password again>")?;
            let session = gate.register(&Registration::new(&words[0], &words[1], &words[2])).await?;
            println!("Welcome, {}", session.email);
        },
        "login" => {
            let words = expect_words(args, 2, "login <email> <password>")?;
            let session = gate.sign_in(&words[0], &words[1]).await?;
            println!("Signed in as {}", session.email);
        },
        "logout" => {
            signed_in(gate)?;
            if confirm("Sign out? [y/N] ", input).await? {
                gate.sign_out().await?;
                println!("Signed out");
            }
        },
        "add" => {
            let handle = signed_in(gate)?;
            let today = Local::now().naive_local().date();
            let draft = apply_fields(TaskDraft::new("", today), &split_words(args), today)?;
            handle.send(Intent::Create(draft))?;
        },
        "edit" => {
            let handle = signed_in(gate)?;
            let words = split_words(args);
            let (number, fields) = words.split_first().ok_or("usage: edit <number> <field>=<value>...")?;
            let task = numbered_task(&handle, number)?;
            let today = Local::now().naive_local().date();
            let draft = apply_fields(task.draft(), fields, today)?;
            handle.send(Intent::Update(task.id().clone(), draft))?;
        },
        "toggle" => {
            let handle = signed_in(gate)?;
            let task = numbered_task(&handle, args)?;
            handle.send(Intent::ToggleComplete(task.id().clone()))?;
        },
        "delete" => {
            let handle = signed_in(gate)?;
            let task = numbered_task(&handle, args)?;
            if confirm(&format!("Delete \"{}\"? [y/N] ", task.title()), input).await? {
                handle.send(Intent::Delete(task.id().clone()))?;
            }
        },
        "view" => {
            let handle = signed_in(gate)?;
            handle.send(Intent::SelectCategory(Category::from_name(args)))?;
        },
        "show" => {
            let handle = signed_in(gate)?;
            utils::print_board(&handle.current_board());
        },
        "stats" => {
            let handle = signed_in(gate)?;
            utils::print_stats(&handle.current_board().stats);
        },
        "calendar" => {
            let handle = signed_in(gate)?;
            println!("{}", handle.current_board().calendar_sync());
        },
        other => return Err(format!("unknown command {:?}, type \"help\" for a list of commands", other).into()),
    }
    Ok(Flow::Continue)
}

fn signed_in(gate: &SessionGate) -> Result<ControllerHandle, Box<dyn Error>> {
    match gate.current() {
        GateState::SignedIn { handle, .. } => Ok(handle),
        GateState::SignedOut => Err("please log in first".into()),
    }
}

fn numbered_task(handle: &ControllerHandle, number: &str) -> Result<taskdeck::Task, Box<dyn Error>> {
    let number: usize = number.trim().parse()
        .map_err(|_| format!("{:?} is not a task number", number))?;
    handle.current_board()
        .visible_task(number)
        .cloned()
        .ok_or_else(|| format!("there is no task #{} in this view", number).into())
}

fn expect_words(args: &str, count: usize, usage: &str) -> Result<Vec<String>, Box<dyn Error>> {
    let words = split_words(args);
    if words.len() != count {
        return Err(format!("usage: {}", usage).into());
    }
    Ok(words)
}

/// Split a command line into words. Double quotes group words together
fn split_words(args: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut started = false;

    for c in args.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                started = true;
            },
            c if c.is_whitespace() && quoted == false => {
                if started {
                    words.push(std::mem::take(&mut current));
                    started = false;
                }
            },
            c => {
                current.push(c);
                started = true;
            },
        }
    }
    if started {
        words.push(current);
    }
    words
}

/// Apply `field=value` words to a draft. A word with no `=` is part of the title
fn apply_fields(mut draft: TaskDraft, words: &[String], today: NaiveDate) -> Result<TaskDraft, Box<dyn Error>> {
    let mut title_words = Vec::new();

    for word in words {
        let (field, value) = match word.split_once('=') {
            None => {
                title_words.push(word.as_str());
                continue;
            },
            Some(pair) => pair,
        };
        match field {
            "title" => draft.title = value.trim().to_string(),
            "note" | "description" => draft.description = value.trim().to_string(),
            "date" => draft.date = parse_date(value, today)?,
            "time" => draft.time = parse_time(value)?,
            "priority" => draft.priority = value.parse::<Priority>()?,
            "calendar" => draft.sync_google = utils::is_yes(value),
            other => return Err(format!("unknown field {:?}", other).into()),
        }
    }

    if title_words.is_empty() == false {
        draft.title = title_words.join(" ");
    }
    draft.validate()?;
    Ok(draft)
}

fn parse_date(value: &str, today: NaiveDate) -> Result<NaiveDate, Box<dyn Error>> {
    match value {
        "today" => Ok(today),
        "tomorrow" => Ok(today + Duration::days(1)),
        other => Ok(NaiveDate::parse_from_str(other, "%Y-%m-%d")?),
    }
}

fn parse_time(value: &str) -> Result<Option<NaiveTime>, Box<dyn Error>> {
    match value {
        "" | "none" => Ok(None),
        other => Ok(Some(NaiveTime::parse_from_str(other, "%H:%M")?)),
    }
}

fn print_help() {
    println!("taskdeck");
    println!("Commands:");
    println!("  register <email> <password> <password again>");
    println!("  login <email> <password>");
    println!("  logout");
    println!("  add <title> [date=YYYY-MM-DD|today|tomorrow] [time=HH:MM] [priority=low|medium|high|urgent] [note=\"...\"] [calendar=yes]");
    println!("  edit <number> [<title>] [<field>=<value>...]");
    println!("  toggle <number>");
    println!("  delete <number>");
    println!("  view today|week|month|all|completed|priority");
    println!("  show");
    println!("  stats");
    println!("  calendar");
    println!("  help");
    println!("  quit");
    println!("Set RUST_LOG for more details about what happens");
}

/// Ask a yes/no question. Anything but a yes (including the end of the input) is a no
async fn confirm(question: &str, input: &mut Input) -> Result<bool, Box<dyn Error>> {
    utils::prompt(question);
    Ok(confirmed(input.next_line().await?))
}

fn confirmed(answer: Option<String>) -> bool {
    answer.map(|answer| utils::is_yes(&answer)).unwrap_or(false)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirmations() {
        assert!(confirmed(Some("y".to_string())));
        assert!(confirmed(Some(" Yes\n".to_string())));
        assert!(confirmed(Some("".to_string())) == false);
        assert!(confirmed(Some("no".to_string())) == false);
        assert!(confirmed(None) == false);
    }

    #[test]
    fn words() {
        assert_eq!(split_words(r#"Buy milk  note="two bottles" "#), vec!["Buy", "milk", "note=two bottles"]);
        assert_eq!(split_words(""), Vec::<String>::new());
        assert_eq!(split_words(r#"title="""#), vec!["title="]);
    }

    #[test]
    fn fields() {
        let today = NaiveDate::from_ymd(2024, 5, 14);
        let words = split_words("Buy milk priority=high date=tomorrow time=09:30 calendar=yes");
        let draft = apply_fields(TaskDraft::new("", today), &words, today).unwrap();
        assert_eq!(draft.title, "Buy milk");
        assert_eq!(draft.priority, Priority::High);
        assert_eq!(draft.date, NaiveDate::from_ymd(2024, 5, 15));
        assert_eq!(draft.time, Some(NaiveTime::from_hms(9, 30, 0)));
        assert!(draft.sync_google);

        assert!(apply_fields(TaskDraft::new("", today), &split_words("priority=high"), today).is_err());
        assert!(apply_fields(TaskDraft::new("", today), &split_words("a colour=red"), today).is_err());
    }
}
