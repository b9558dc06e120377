//! `partdesk extract`: run the code extractor on a message.

use {
    anyhow::Result,
    clap::Args,
    partdesk_config::PartdeskConfig,
    partdesk_responder::{CodeExtractor, Extraction},
};

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Message text; multiple words are joined with spaces.
    #[arg(required = true)]
    text: Vec<String>,
    /// Print the result as JSON.
    #[arg(long)]
    json: bool,
}

fn action(extraction: &Extraction) -> &'static str {
    match (extraction.tokens.is_empty(), extraction.has_non_code) {
        (true, _) => "escalate",
        (false, true) => "reply, then escalate",
        (false, false) => "reply",
    }
}

fn render_text(extraction: &Extraction) -> String {
    let mut out = String::new();
    if extraction.tokens.is_empty() {
        out.push_str("codes:    (none)\n");
    } else {
        out.push_str("codes:\n");
        for token in &extraction.tokens {
            out.push_str(&format!("  {}  (key {})\n", token.text, token.key));
        }
    }
    let other = if extraction.has_non_code { "yes" } else { "no" };
    out.push_str(&format!("other text: {other}\n"));
    out.push_str(&format!("action:   {}\n", action(extraction)));
    out
}

fn render_json(extraction: &Extraction) -> Result<String> {
    Ok(serde_json::to_string_pretty(&serde_json::json!({
        "tokens": extraction.tokens,
        "has_non_code": extraction.has_non_code,
        "needs_escalation": extraction.needs_escalation(),
        "action": action(extraction),
    }))?)
}

pub fn handle_extract(config: &PartdeskConfig, args: ExtractArgs) -> Result<()> {
    let extractor = CodeExtractor::new(&config.responder.benign_words);
    let extraction = extractor.analyze(&args.text.join(" "));
    if args.json {
        println!("{}", render_json(&extraction)?);
    } else {
        print!("{}", render_text(&extraction));
    }
    Ok(())
}
