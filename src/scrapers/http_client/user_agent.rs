//! User agent selection for plain HTTP fetches.

pub const USER_AGENT: &str = "newsacquire/0.1 (press-release archiver)";

/// Desktop browser agents for sites that reject unknown clients.
const BROWSER_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.1 Safari/605.1.15",
];

fn pick_browser_agent() -> &'static str {
    let idx = chrono::Utc::now().timestamp_subsec_nanos() as usize % BROWSER_USER_AGENTS.len();
    BROWSER_USER_AGENTS[idx]
}

/// `None` keeps the crate's own agent, `"impersonate"` picks a browser agent,
/// anything else is sent verbatim.
pub fn resolve_user_agent(setting: Option<&str>) -> String {
    match setting.map(str::trim) {
        None | Some("") => USER_AGENT.to_string(),
        Some("impersonate") => pick_browser_agent().to_string(),
        Some(custom) => custom.to_string(),
    }
}
