use anyhow::{Context, Result};
use serde_json::json;

use oc_core::simulate_match_json;

/// Simulate one full match through the JSON facade and print the book.
///
/// Usage: sim_match [seed] [overs]
fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let seed: u64 = match args.next() {
        Some(raw) => raw.parse().context("seed must be a non-negative integer")?,
        None => 42,
    };
    let overs: u8 = match args.next() {
        Some(raw) => raw.parse().context("overs must fit in 1..=50")?,
        None => 20,
    };

    let roster = |prefix: &str| -> serde_json::Value {
        let players: Vec<serde_json::Value> = (1..=11)
            .map(|n| json!({"name": format!("{prefix} {n}"), "wicketkeeper": n == 2}))
            .collect();
        json!(players)
    };

    let request = json!({
        "schema_version": 1,
        "seed": seed,
        "team_one": {"name": "Harbour CC", "players": roster("Harbour")},
        "team_two": {"name": "Valley XI", "players": roster("Valley")},
        "overs_limit": overs
    });

    println!("🏏 Overcrease: Harbour CC v Valley XI, {overs} overs, seed {seed}");

    let response = simulate_match_json(&request.to_string())
        .context("simulation failed")?;
    let match_doc: serde_json::Value =
        serde_json::from_str(&response).context("response was not valid JSON")?;

    for card in match_doc["scorecards"].as_array().into_iter().flatten() {
        print_scorecard(card);
    }

    println!();
    println!("Result: {}", match_doc["result"]["text"].as_str().unwrap_or("?"));
    println!(
        "({} deliveries bowled; run again with the same seed for the same match)",
        match_doc["deliveries"]
    );

    Ok(())
}

fn print_scorecard(card: &serde_json::Value) {
    println!();
    println!(
        "=== Innings {}: {} {}/{} ({} ov) ===",
        card["innings"],
        card["batting_team"].as_str().unwrap_or("?"),
        card["summary"]["total"],
        card["summary"]["wickets"],
        card["summary"]["overs"].as_str().unwrap_or("0"),
    );

    for line in card["batting"].as_array().into_iter().flatten() {
        // Batting rows only list players who faced up; absent a dismissal
        // line they finished not out.
        let how_out = line["dismissal"].as_str().unwrap_or("not out");
        println!(
            "  {:<12} {:<22} {:>4} ({} balls, {}x4, {}x6)",
            line["name"].as_str().unwrap_or("?"),
            how_out,
            line["runs"],
            line["balls"],
            line["fours"],
            line["sixes"],
        );
    }

    println!(
        "  Extras: {} (w {}, nb {}, b {}, lb {})",
        card["extras"]["total"],
        card["extras"]["wides"],
        card["extras"]["no_balls"],
        card["extras"]["byes"],
        card["extras"]["leg_byes"],
    );

    println!("  Bowling:");
    for line in card["bowling"].as_array().into_iter().flatten() {
        println!(
            "  {:<12} {:>5} ov, {} maiden(s), {}/{}  econ {:.2}",
            line["name"].as_str().unwrap_or("?"),
            line["overs"].as_str().unwrap_or("0"),
            line["maidens"],
            line["wickets"],
            line["runs"],
            line["economy"].as_f64().unwrap_or(0.0),
        );
    }

    let falls = card["fall_of_wickets"].as_array();
    if falls.map(|f| !f.is_empty()).unwrap_or(false) {
        let rendered: Vec<String> = falls
            .into_iter()
            .flatten()
            .map(|f| {
                format!(
                    "{}-{} ({}, {})",
                    f["wicket"],
                    f["score"],
                    f["batter"].as_str().unwrap_or("?"),
                    f["over"].as_str().unwrap_or("?"),
                )
            })
            .collect();
        println!("  Fall: {}", rendered.join(", "));
    }
}
