use std::io::{self, Write};
use std::sync::Arc;

use crate::commands::CommandResult;
use asesor_agent::{AdvisorPipeline, OllamaClient};
use asesor_core::config::{AppConfig, LoadOptions};
use asesor_core::domain::query::clean_text;
use asesor_core::routing;
use asesor_core::{AdvisorDomain, ChatMessage, Conversation, ParamKind, QueryParams};
use asesor_db::repositories::SqlAdvisorDataRepository;
use asesor_db::{connect_with_settings, migrations};

const EXIT_WORDS: [&str; 3] = ["salir", "exit", "quit"];

pub fn run(domain_slug: &str) -> CommandResult {
    let Some(domain) = AdvisorDomain::from_slug(domain_slug) else {
        return CommandResult::failure(
            "chat",
            "unknown_advisor",
            format!(
                "no advisor is registered under `{domain_slug}` (expected financiero, marketing or mercado)"
            ),
            2,
        );
    };

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let repository = Arc::new(SqlAdvisorDataRepository::new(pool.clone()));
        let llm = Arc::new(OllamaClient::from_config(&config.llm));
        let pipeline = AdvisorPipeline::new(repository, llm);

        chat_loop(domain, &pipeline).await;

        pool.close().await;
        Ok::<(), (&'static str, String, u8)>(())
    });

    match result {
        Ok(()) => CommandResult { exit_code: 0, output: String::new() },
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("chat", error_class, message, exit_code)
        }
    }
}

async fn chat_loop(domain: AdvisorDomain, pipeline: &AdvisorPipeline) {
    let profile = domain.profile();
    println!("{}", profile.banner);
    println!("{}", profile.subtitle);
    println!("Escribe 'salir' para terminar la conversación.");

    let mut conversation = Conversation::new();

    loop {
        let Some(line) = read_prompted_line("Tú: ") else {
            println!("{}: ¡Hasta luego!", profile.display_name);
            break;
        };

        let question = line.trim().to_string();
        if question.is_empty() {
            continue;
        }
        if is_exit_word(&question) {
            println!("{}: ¡Hasta luego!", profile.display_name);
            break;
        }

        let params = collect_params(domain, &question);

        conversation.push(ChatMessage::user(question));
        let reply = pipeline.respond(domain, &conversation, &params).await;
        println!("{}: {reply}", profile.display_name);
        conversation.push(ChatMessage::assistant(reply));
    }
}

// Parameterized questions ask for their extra inputs one line at a time,
// in predicate order. A blank or unparseable answer leaves the value unset
// and the reply falls back to general knowledge.
fn collect_params(domain: AdvisorDomain, question: &str) -> QueryParams {
    let mut params = QueryParams::default();
    for kind in routing::required_params(domain, question).iter().copied() {
        let Some(answer) = read_prompted_line(&format!("{} ", kind.prompt_label())) else {
            break;
        };
        match kind {
            ParamKind::Category => params.category = clean_text(Some(answer)),
            ParamKind::Location => params.location = clean_text(Some(answer)),
            ParamKind::Product => params.product = clean_text(Some(answer)),
            ParamKind::Objective => params.objective = clean_text(Some(answer)),
            ParamKind::Budget => params.budget = parse_budget(&answer),
        }
    }
    params
}

fn parse_budget(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|value| *value != 0.0)
}

fn is_exit_word(input: &str) -> bool {
    EXIT_WORDS.contains(&input.to_lowercase().as_str())
}

fn read_prompted_line(prompt: &str) -> Option<String> {
    print!("{prompt}");
    let _ = io::stdout().flush();

    let mut line = String::new();
    match io::stdin().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line),
    }
}

#[cfg(test)]
mod tests {
    use super::{is_exit_word, parse_budget, run};
    use serde_json::Value;

    #[test]
    fn unknown_advisor_is_rejected_before_any_io() {
        let result = run("bolsa");
        assert_eq!(result.exit_code, 2);

        let payload: Value =
            serde_json::from_str(&result.output).expect("command output should be valid JSON");
        assert_eq!(payload["command"], "chat");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "unknown_advisor");
    }

    #[test]
    fn exit_words_match_case_insensitively() {
        assert!(is_exit_word("salir"));
        assert!(is_exit_word("SALIR"));
        assert!(is_exit_word("Exit"));
        assert!(is_exit_word("quit"));
        assert!(!is_exit_word("adiós"));
        assert!(!is_exit_word("salir ya"));
    }

    #[test]
    fn budget_answers_parse_or_stay_unset() {
        assert_eq!(parse_budget("450"), Some(450.0));
        assert_eq!(parse_budget(" 1500.50 "), Some(1500.5));
        assert_eq!(parse_budget("0"), None);
        assert_eq!(parse_budget("quinientos"), None);
        assert_eq!(parse_budget(""), None);
    }
}
