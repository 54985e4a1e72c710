//! Advisory market notes and daily realtor tips from a chat-completion
//! endpoint, with canned fallbacks.
//!
//! The remote call is optional: without `DEEPSEEK_API_KEY` (or when the call
//! fails for any reason) market notes are built from the market file and tips
//! come from a fixed table keyed by weekday.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Datelike, Local, Weekday};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::domain::{Leverage, MarketFile};
use crate::error::AppError;

const BASE_URL: &str = "https://api.deepseek.com/v1/chat/completions";
const MODEL: &str = "deepseek-chat";

struct Completion {
    system: &'static str,
    max_tokens: u32,
    temperature: f64,
}

const MARKET_COMPLETION: Completion = Completion {
    system: "You are a real estate market analyst providing concise, actionable insights.",
    max_tokens: 300,
    temperature: 0.7,
};

const TIP_COMPLETION: Completion = Completion {
    system: "You are a real estate coach helping agents succeed.",
    max_tokens: 400,
    temperature: 0.8,
};

const ACTION_PHRASES: [&str; 7] = [
    "focus on",
    "consider",
    "look for",
    "target",
    "prioritize",
    "recommend",
    "suggest",
];
const MAX_ACTION_ITEMS: usize = 3;
const FALLBACK_CONFIDENCE: u8 = 75;

pub const ADVISOR_FILE_NAME: &str = "ai_insights.json";

/// One advisory note for a ZIP code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisorNote {
    pub id: String,
    pub timestamp: String,
    pub zip_code: String,
    pub insight: String,
    pub source: String,
    pub action_items: Vec<String>,
    pub confidence_score: u8,
}

/// Who a daily tip is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperienceLevel {
    New,
    Intermediate,
    Experienced,
}

impl ExperienceLevel {
    pub const ALL: [ExperienceLevel; 3] = [
        ExperienceLevel::New,
        ExperienceLevel::Intermediate,
        ExperienceLevel::Experienced,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ExperienceLevel::New => "new",
            ExperienceLevel::Intermediate => "intermediate",
            ExperienceLevel::Experienced => "experienced",
        }
    }

    fn audience(self) -> &'static str {
        match self {
            ExperienceLevel::New => "a brand new realtor just starting out",
            ExperienceLevel::Intermediate => "an experienced realtor with 1-3 years in the business",
            ExperienceLevel::Experienced => "a seasoned realtor with 5+ years of experience",
        }
    }
}

/// The five parts of a tip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TipBody {
    pub title: String,
    pub tip: String,
    pub action: String,
    pub conversation_starter: String,
    pub confidence_builder: String,
}

/// One daily tip for one experience level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTip {
    pub id: String,
    pub timestamp: String,
    pub experience_level: ExperienceLevel,
    pub tip: TipBody,
    /// Full weekday name, e.g. `Monday`.
    pub day_of_week: String,
    pub source: String,
}

/// The `ai_insights.json` document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorReport {
    pub generated_at: String,
    /// ZIP -> experience level label -> tip.
    #[serde(default)]
    pub daily_tips: BTreeMap<String, BTreeMap<String, DailyTip>>,
    pub market_insights: BTreeMap<String, AdvisorNote>,
}

/// `DEEPSEEK_API_KEY` from the environment (after loading `.env`), if non-blank.
pub fn api_key_from_env() -> Option<String> {
    dotenvy::dotenv().ok();
    std::env::var("DEEPSEEK_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty())
}

pub struct AdvisorClient {
    client: Client,
    api_key: Option<String>,
}

impl AdvisorClient {
    /// `api_key: None` never touches the network.
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::network(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, api_key })
    }

    pub fn has_remote(&self) -> bool {
        self.api_key.is_some()
    }

    /// Produce a note for `market`, never failing.
    pub fn market_note(&self, market: &MarketFile) -> AdvisorNote {
        let Some(key) = &self.api_key else {
            return fallback_note(market);
        };
        match self.request_completion(key, &MARKET_COMPLETION, &build_prompt(market)) {
            Ok(text) => {
                let now = Local::now();
                AdvisorNote {
                    id: format!("insight_{}", now.timestamp()),
                    timestamp: now.to_rfc3339(),
                    zip_code: market.zip.clone(),
                    action_items: extract_action_items(&text),
                    insight: text,
                    source: "deepseek_ai".to_string(),
                    confidence_score: confidence_score(market),
                }
            }
            Err(e) => {
                log::warn!("Advisory request for ZIP {} failed: {e}", market.zip);
                fallback_note(market)
            }
        }
    }

    /// Produce today's tip for `level`, never failing.
    pub fn daily_tip(&self, level: ExperienceLevel, now: DateTime<Local>) -> DailyTip {
        let Some(key) = &self.api_key else {
            return fallback_tip(level, now);
        };
        match self.request_completion(key, &TIP_COMPLETION, &build_tip_prompt(level, now)) {
            Ok(text) => DailyTip {
                id: format!("tip_{}", now.timestamp()),
                timestamp: now.to_rfc3339(),
                experience_level: level,
                tip: parse_tip_body(&text),
                day_of_week: now.format("%A").to_string(),
                source: "deepseek_ai".to_string(),
            },
            Err(e) => {
                log::warn!("Daily tip request ({}) failed: {e}", level.label());
                fallback_tip(level, now)
            }
        }
    }

    /// One note per market and one tip per experience level, keyed by ZIP.
    ///
    /// Tips do not depend on the market, so each level is generated once and
    /// shared by every ZIP.
    pub fn report(&self, markets: &[MarketFile]) -> AdvisorReport {
        let now = Local::now();
        let tips: BTreeMap<String, DailyTip> = ExperienceLevel::ALL
            .iter()
            .map(|level| (level.label().to_string(), self.daily_tip(*level, now)))
            .collect();

        let market_insights = markets
            .iter()
            .map(|m| (m.zip.clone(), self.market_note(m)))
            .collect();
        let daily_tips = markets
            .iter()
            .map(|m| (m.zip.clone(), tips.clone()))
            .collect();

        AdvisorReport {
            generated_at: now.to_rfc3339(),
            daily_tips,
            market_insights,
        }
    }

    fn request_completion(
        &self,
        key: &str,
        completion: &Completion,
        prompt: &str,
    ) -> Result<String, AppError> {
        let payload = ChatRequest {
            model: MODEL,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: completion.system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            max_tokens: completion.max_tokens,
            temperature: completion.temperature,
        };

        let resp = self
            .client
            .post(BASE_URL)
            .bearer_auth(key)
            .json(&payload)
            .send()
            .map_err(|e| AppError::network(format!("Advisory request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::network(format!(
                "Advisory request failed with status {}.",
                resp.status()
            )));
        }

        let body: ChatResponse = resp
            .json()
            .map_err(|e| AppError::network(format!("Failed to parse advisory response: {e}")))?;

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::network("Advisory response had no content."))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

pub fn build_prompt(market: &MarketFile) -> String {
    format!(
        "As a real estate market analyst, provide a concise, data-driven insight based on this market data:\n\
         \n\
         Market Overview for ZIP {zip} ({city}):\n\
         - Inventory proxy: {active} active listings ({inv_change:+.1}% change)\n\
         - Median list price: ${list}\n\
         - Median sale price: ${sale}\n\
         - Days on market: {dom} ({dom_change:+} vs prior period)\n\
         - Market trend: {trend}\n\
         - Months of supply: {supply:.1}\n\
         - Leverage: {leverage}\n\
         \n\
         Generate a practical insight for realtors. Focus on:\n\
         1. What this means for buyers vs sellers\n\
         2. One specific opportunity in the current market\n\
         3. One thing to watch out for\n\
         4. Recommended strategy for this week\n\
         \n\
         Keep it under 150 words. Be direct and actionable.",
        zip = market.zip,
        city = market.city,
        active = market.inventory.active,
        inv_change = market.inventory.change_pct,
        list = market.pricing.median_list,
        sale = market.pricing.median_sale,
        dom = market.velocity.avg_dom,
        dom_change = market.velocity.dom_change,
        trend = market.pricing.trend.label(),
        supply = market.velocity.months_supply,
        leverage = market.signals.seller_leverage.label(),
    )
}

pub fn build_tip_prompt(level: ExperienceLevel, now: DateTime<Local>) -> String {
    let weekday = now.format("%A");
    format!(
        "Generate a daily professional tip for {audience}.\n\
         \n\
         Today's date: {date}\n\
         \n\
         The tip should:\n\
         1. Be specific and actionable (something they can do today)\n\
         2. Help build their business or serve clients better\n\
         3. Include one specific conversation starter\n\
         4. Be encouraging and confidence-building\n\
         \n\
         Consider what real estate work typically happens on a {weekday}.\n\
         \n\
         Reply with only a JSON object with the string fields \
         \"title\", \"tip\", \"action\", \"conversation_starter\" and \"confidence_builder\".",
        audience = level.audience(),
        date = now.format("%A, %B %d, %Y"),
    )
}

/// Read a tip reply as JSON; anything else becomes the tip text of a generic body.
pub fn parse_tip_body(text: &str) -> TipBody {
    let trimmed = text
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    serde_json::from_str(trimmed).unwrap_or_else(|_| TipBody {
        title: "Daily Professional Tip".to_string(),
        tip: text.trim().to_string(),
        action: "Review this tip and implement one thing today".to_string(),
        conversation_starter: "I was reviewing the latest market data and noticed...".to_string(),
        confidence_builder: "Your knowledge and preparation make you valuable to clients."
            .to_string(),
    })
}

/// Canned tip for `now`'s weekday.
pub fn fallback_tip(level: ExperienceLevel, now: DateTime<Local>) -> DailyTip {
    DailyTip {
        id: format!("fallback_tip_{}", now.timestamp()),
        timestamp: now.to_rfc3339(),
        experience_level: level,
        tip: tip_for_weekday(now.weekday()),
        day_of_week: now.format("%A").to_string(),
        source: "fallback".to_string(),
    }
}

pub fn tip_for_weekday(day: Weekday) -> TipBody {
    let (title, tip, action, conversation_starter, confidence_builder) = match day {
        Weekday::Mon => (
            "Start Strong",
            "Review all new listings and price changes from the weekend. Update your CMAs and reach out to 3 past clients with a market update.",
            "Schedule 2 showings for this week",
            "I noticed some interesting price changes over the weekend...",
            "Your preparation sets you apart from other agents.",
        ),
        Weekday::Tue => (
            "Client Connection Day",
            "Focus on client follow-ups and consultations. Perfect day for market updates and answering questions.",
            "Call 5 clients with personalized updates",
            "Based on your criteria, I found...",
            "Your knowledge builds client trust instantly.",
        ),
        Weekday::Wed => (
            "Mid-Week Momentum",
            "Update all your listings with fresh photos and descriptions. Check competitor pricing.",
            "Refresh 2 listing descriptions",
            "The mid-week market shows...",
            "Your attention to detail makes listings stand out.",
        ),
        Weekday::Thu => (
            "Weekend Preparation",
            "Prepare for weekend showings and open houses. Confirm all appointments.",
            "Schedule 3 weekend showings",
            "This weekend presents great opportunities because...",
            "Your organization ensures smooth transactions.",
        ),
        Weekday::Fri => (
            "Follow-Up Focus",
            "Follow up on all week's leads and showings. Prepare weekend showing packets.",
            "Send 5 follow-up emails from this week",
            "Following up on our conversation about...",
            "Your persistence converts leads to clients.",
        ),
        Weekday::Sat => (
            "Showcase Day",
            "Perfect day for open houses and showings. Be prepared with market data for buyer questions.",
            "Host at least 1 open house",
            "Welcome! Let me show you why this property stands out...",
            "Your expertise shines during showings.",
        ),
        Weekday::Sun => (
            "Strategy Session",
            "Review the week's activity and plan for next week. Update your business goals.",
            "Plan next week's schedule",
            "Looking ahead to next week...",
            "Your strategic planning drives long-term success.",
        ),
    };
    TipBody {
        title: title.to_string(),
        tip: tip.to_string(),
        action: action.to_string(),
        conversation_starter: conversation_starter.to_string(),
        confidence_builder: confidence_builder.to_string(),
    }
}

/// Sentences that contain an action phrase, at most three.
pub fn extract_action_items(text: &str) -> Vec<String> {
    text.split('.')
        .map(str::trim)
        .filter(|sentence| {
            let lower = sentence.to_lowercase();
            ACTION_PHRASES.iter().any(|p| lower.contains(p))
        })
        .take(MAX_ACTION_ITEMS)
        .map(str::to_string)
        .collect()
}

/// 50 plus 10 for each populated headline figure, capped at 95.
pub fn confidence_score(market: &MarketFile) -> u8 {
    let populated = [
        market.inventory.active > 0,
        market.pricing.median_list > 0,
        market.velocity.avg_dom > 0,
        market.velocity.absorption_rate > 0.0,
    ];
    let score = 50 + 10 * populated.iter().filter(|p| **p).count() as u8;
    score.min(95)
}

/// Canned note picked from the market conditions.
pub fn fallback_note(market: &MarketFile) -> AdvisorNote {
    let active = market.inventory.active;
    let insight = if market.velocity.avg_dom >= 30 {
        format!(
            "Current market shows {} average days on market. Consider price adjustments for stagnant listings.",
            market.velocity.avg_dom
        )
    } else if market.signals.seller_leverage == Leverage::Buyer {
        format!(
            "Market inventory at {active} listings suggests a buyer favored market. \
             Rising price reductions indicate some seller flexibility."
        )
    } else {
        format!(
            "With {active} active listings and median price of ${}, the market shows {} conditions. \
             Consider focusing on properties that have been on market 30+ days for potential negotiations.",
            market.pricing.median_list,
            market.pricing.trend.label()
        )
    };

    let now = Local::now();
    AdvisorNote {
        id: format!("fallback_{}", now.timestamp()),
        timestamp: now.to_rfc3339(),
        zip_code: market.zip.clone(),
        insight,
        source: "fallback_ai".to_string(),
        action_items: vec![
            "Review market data daily".to_string(),
            "Update client communications".to_string(),
            "Adjust pricing strategies".to_string(),
        ],
        confidence_score: FALLBACK_CONFIDENCE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MarketProfile;
    use chrono::{NaiveDate, TimeZone};

    fn placeholder() -> MarketFile {
        let day = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        MarketFile::placeholder("31088", &MarketProfile::default(), day)
    }

    #[test]
    fn action_items_are_sentences_with_action_phrases() {
        let text = "Inventory is tight. Focus on pre-approved buyers. Rates are stable. \
                    Consider pricing at market. We suggest weekend open houses. Target relocations.";
        let items = extract_action_items(text);
        assert_eq!(
            items,
            vec![
                "Focus on pre-approved buyers",
                "Consider pricing at market",
                "We suggest weekend open houses",
            ]
        );
    }

    #[test]
    fn confidence_counts_populated_fields() {
        let mut market = placeholder();
        assert_eq!(confidence_score(&market), 90);
        market.velocity.absorption_rate = 0.0;
        market.inventory.active = 0;
        assert_eq!(confidence_score(&market), 70);
    }

    #[test]
    fn fallback_note_uses_days_on_market_when_slow() {
        let note = fallback_note(&placeholder());
        assert_eq!(note.source, "fallback_ai");
        assert_eq!(note.confidence_score, 75);
        assert!(note.insight.contains("30 average days on market"));
        assert_eq!(note.zip_code, "31088");
    }

    fn at(year: i32, month: u32, day: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn fallback_tip_follows_the_weekday() {
        // 2025-06-02 is a Monday.
        let monday = fallback_tip(ExperienceLevel::New, at(2025, 6, 2));
        assert_eq!(monday.day_of_week, "Monday");
        assert_eq!(monday.tip.title, "Start Strong");
        assert_eq!(monday.source, "fallback");
        assert_eq!(monday.experience_level, ExperienceLevel::New);

        let saturday = fallback_tip(ExperienceLevel::Experienced, at(2025, 6, 7));
        assert_eq!(saturday.day_of_week, "Saturday");
        assert_eq!(saturday.tip.action, "Host at least 1 open house");

        let sunday = fallback_tip(ExperienceLevel::Intermediate, at(2025, 6, 8));
        assert_eq!(sunday.tip.title, "Strategy Session");
    }

    #[test]
    fn every_weekday_has_its_own_tip() {
        let days = [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ];
        let mut titles: Vec<String> = days.iter().map(|d| tip_for_weekday(*d).title).collect();
        titles.sort();
        titles.dedup();
        assert_eq!(titles.len(), 7);
    }

    #[test]
    fn tip_reply_parses_json_or_wraps_text() {
        let json = r#"```json
{"title": "T", "tip": "Call back", "action": "A", "conversation_starter": "C", "confidence_builder": "B"}
```"#;
        assert_eq!(parse_tip_body(json).tip, "Call back");

        let plain = parse_tip_body("  Call three past clients today. ");
        assert_eq!(plain.title, "Daily Professional Tip");
        assert_eq!(plain.tip, "Call three past clients today.");
    }

    #[test]
    fn offline_report_has_tips_for_every_zip_and_level() {
        let client = AdvisorClient::new(None, Duration::from_secs(1)).unwrap();
        assert!(!client.has_remote());

        let mut other = placeholder();
        other.zip = "31093".to_string();
        let report = client.report(&[placeholder(), other]);

        assert_eq!(report.market_insights.len(), 2);
        assert_eq!(report.daily_tips.len(), 2);
        let tips = &report.daily_tips["31093"];
        assert_eq!(
            tips.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["experienced", "intermediate", "new"]
        );
        assert!(tips.values().all(|t| t.source == "fallback"));
        assert_eq!(report.market_insights["31088"].source, "fallback_ai");
    }

    #[test]
    fn prompt_mentions_zip_and_trend() {
        let prompt = build_prompt(&placeholder());
        assert!(prompt.contains("ZIP 31088 (Warner Robins)"));
        assert!(prompt.contains("Market trend: neutral"));
    }
}
