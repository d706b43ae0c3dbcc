//! `doctor` command — diagnose configuration and wiring.

use heatline_config::AppConfig;

pub fn run(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("Heatline doctor");
    println!("===============");
    println!();
    println!("Company:        {}", config.company.name);
    println!("Contact phone:  {}", config.company.contact_phone);
    println!();
    println!("Completion:     {} ({})", config.completion.model, config.completion.api_url);
    match &config.completion.api_key {
        Some(_) => println!("API key:        configured"),
        None => println!("API key:        MISSING — set HEATLINE_API_KEY or completion.api_key"),
    }
    println!();
    println!("Retrieval:      {}", config.retrieval.backend);
    println!(
        "                threshold {:.2}, top_k {}",
        config.retrieval.threshold, config.retrieval.top_k
    );
    println!("Audit sink:     {}", config.audit.sink);
    println!(
        "Gateway:        {}:{} ({} bearer token(s))",
        config.gateway.host,
        config.gateway.port,
        config.gateway.bearer_tokens.len()
    );
    println!();

    let state = heatline_gateway::build_state(config)?;
    let _ = state; // wiring succeeded if we got here
    println!("Wiring:         ok");

    Ok(())
}
