use rustyline::{error::ReadlineError, DefaultEditor};

use graphlens::schema_context::{DynamicSchemaExtractor, DynamicSchemaResult};

fn print_usage() {
    println!("GraphLens Commands:");
    println!("  <question>        - Extract the schema context for a question (default)");
    println!("  :terms <text>     - Show extracted terms and candidate labels/types");
    println!("  :json <text>      - Extract and print the result as JSON");
    println!("  :stats            - Show cache metrics");
    println!("  :clear            - Clear the result cache");
    println!("  :reload           - Reload mapping tables (clears the cache)");
    println!("  :help             - Show this help");
    println!("  :quit             - Exit");
    println!();
    println!("Examples:");
    println!("  查询张三的凭证信息");
    println!("  :terms 显示应付账款科目的余额");
}

pub fn print_result(result: &DynamicSchemaResult, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        println!("{}", result.to_markdown());
    }
    Ok(())
}

pub async fn run(extractor: &DynamicSchemaExtractor, json: bool) -> anyhow::Result<()> {
    let mut rl = DefaultEditor::new()?;

    let term_mode = if extractor.suggester_enabled() {
        "rules + LLM"
    } else {
        "rules only"
    };
    println!(
        "\nGraphLens v{} ({} term extraction)",
        env!("CARGO_PKG_VERSION"),
        term_mode
    );
    println!("Type :help for commands.\n");

    loop {
        match rl.readline("graphlens :) ") {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                rl.add_history_entry(input)?;

                if input.starts_with(':') {
                    let parts: Vec<&str> = input.splitn(2, ' ').collect();
                    let cmd = parts[0];
                    let arg = parts.get(1).map(|s| s.trim()).filter(|s| !s.is_empty());

                    match cmd {
                        ":help" | ":h" => print_usage(),
                        ":quit" | ":q" | ":exit" => break,
                        ":clear" => {
                            extractor.clear_cache();
                            println!("Cache cleared.");
                        }
                        ":reload" => match extractor.reload_mappings() {
                            Ok(tables) => println!("Reloaded mapping tables '{}'.", tables.name()),
                            Err(e) => eprintln!("Reload failed, keeping current tables: {}", e),
                        },
                        ":stats" => {
                            let metrics = extractor.cache_metrics();
                            println!("\n=== Cache ===\n");
                            println!("  entries:     {}/{}", metrics.size, metrics.max_entries);
                            println!("  hits:        {}", metrics.hits);
                            println!("  misses:      {}", metrics.misses);
                            println!("  expirations: {}", metrics.expirations);
                            println!("  evictions:   {}", metrics.evictions);
                            println!("  hit rate:    {:.1}%\n", metrics.hit_rate() * 100.0);
                        }
                        ":terms" | ":t" => match arg {
                            Some(text) => {
                                let terms = extractor.extract_terms(text).await;
                                let candidates = extractor.match_candidates(&terms);
                                println!("\n  entities:   {:?}", terms.entities);
                                println!("  attributes: {:?}", terms.attributes);
                                println!("  actions:    {:?}", terms.actions);
                                println!("  labels:     {:?}", candidates.node_labels);
                                println!("  rel types:  {:?}\n", candidates.relationship_types);
                            }
                            None => println!("Usage: :terms <text>"),
                        },
                        ":json" | ":j" => match arg {
                            Some(text) => extract_and_print(extractor, text, true).await,
                            None => println!("Usage: :json <text>"),
                        },
                        _ => {
                            println!(
                                "Unknown command: {}. Type :help for available commands.",
                                cmd
                            );
                        }
                    }
                    continue;
                }

                extract_and_print(extractor, input, json).await;
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!("\nBye.");
                break;
            }
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}

async fn extract_and_print(extractor: &DynamicSchemaExtractor, text: &str, json: bool) {
    match extractor.extract(text).await {
        Ok(result) => {
            if let Err(e) = print_result(&result, json) {
                eprintln!("Error: {}", e);
            }
        }
        Err(e) => eprintln!("Error: {}", e),
    }
}
