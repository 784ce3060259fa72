//! Reactions to greetings, links, catchphrases, and typo corrections.

use crate::command::{bot_pattern, Command, CommandContext, CommandDescriptor, PrivilegePolicy};
use anyhow::Result;
use gambit_types::Reply;
use rand::seq::SliceRandom;
use regex::{NoExpand, Regex, RegexBuilder};

const GREETINGS: [&str; 8] = [
    "hi",
    "hello",
    "hey",
    "howdy",
    "salutations",
    "greetings",
    "'ello",
    "hola",
];

const CLEANING_LADY: [&str; 6] = [
    "Tell it to the cleaning lady on Monday.",
    "Because you'll be dust by Monday...",
    "Because you'll be pulverized in two seconds...",
    "The cleaning lady? She cleans up... dust. She dusts.",
    "'Cause... it's Friday now, and she has the weekends off, so...",
    "Monday... right?",
];

const SWEARS: [&str; 8] = [
    "Blood and bloody ashes!",
    "Mother's milk in a cup!",
    "Oh sheep swallop!",
    "Bloody buttered onions!",
    "You wool-headed buffoon!",
    "You hairy lummox!",
    "You milk-hearted wetlander!",
    "You bloody ox of a thimble-brained man!",
];

static SAY_HI: CommandDescriptor = CommandDescriptor::new("SayHi", PrivilegePolicy::Registry);
static SAY_URL: CommandDescriptor = CommandDescriptor::new("SayUrl", PrivilegePolicy::Registry);
static SUBSTITUTE: CommandDescriptor = CommandDescriptor::new("Substitute", PrivilegePolicy::Registry);
static DAD_JOKE: CommandDescriptor = CommandDescriptor::new("DadJoke", PrivilegePolicy::Registry)
    .documented(
        "dad joke",
        "Dad Joke Command - example: 'gambit: dad joke' tells a horrible dad joke.",
        "gambit: dad joke",
    );
static SAY_WAT: CommandDescriptor = CommandDescriptor::new("SayWat", PrivilegePolicy::Registry);
static ITS_A_TRAP: CommandDescriptor = CommandDescriptor::new("ItsATrap", PrivilegePolicy::Registry);
static GRAILS: CommandDescriptor = CommandDescriptor::new("Grails", PrivilegePolicy::Registry);
static GOOD_NEWS: CommandDescriptor = CommandDescriptor::new("GoodNews", PrivilegePolicy::Registry);
static SPOILER_ALERT: CommandDescriptor =
    CommandDescriptor::new("SpoilerAlert", PrivilegePolicy::Registry);
static CLEANING_LADY_DESCRIPTOR: CommandDescriptor =
    CommandDescriptor::new("CleaningLady", PrivilegePolicy::Registry);
static WOT_SWEAR: CommandDescriptor = CommandDescriptor::new("WotSwear", PrivilegePolicy::Registry);

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn pick<'a>(ctx: &CommandContext<'_>, choices: &'a [&'a str]) -> Option<&'a str> {
    ctx.state.with_rng(|rng| choices.choose(rng).copied())
}

pub struct SayHi {
    pattern: Regex,
}

impl SayHi {
    pub fn new(bot_name: &str) -> Result<Self> {
        Ok(Self {
            pattern: bot_pattern(bot_name, r"^(.+?)[:,]? {bot}[.!?]?$")?,
        })
    }
}

impl Command for SayHi {
    type Args = ();

    fn descriptor(&self) -> &'static CommandDescriptor {
        &SAY_HI
    }

    fn matches(&self, ctx: &CommandContext<'_>) -> Option<()> {
        let captures = self.pattern.captures(ctx.text())?;
        let greeting = captures[1].to_lowercase();
        GREETINGS.contains(&greeting.as_str()).then_some(())
    }

    fn execute(&self, ctx: &CommandContext<'_>, _args: ()) -> Result<Vec<Reply>> {
        let name = ctx
            .state
            .resolver()
            .honorific_display_name(ctx.actor(), ctx.conversation_id())?;
        let greeting = pick(ctx, &GREETINGS).unwrap_or("hi");
        Ok(vec![Reply::text(format!("{}, {name}!", capitalize(greeting)))])
    }
}

pub struct SayUrl {
    pattern: Regex,
}

impl SayUrl {
    pub fn new() -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(r#"https?://[^\s<>"']+"#)?,
        })
    }
}

impl Command for SayUrl {
    type Args = String;

    fn descriptor(&self) -> &'static CommandDescriptor {
        &SAY_URL
    }

    fn matches(&self, ctx: &CommandContext<'_>) -> Option<String> {
        self.pattern
            .find(ctx.text())
            .map(|found| found.as_str().to_string())
    }

    fn execute(&self, ctx: &CommandContext<'_>, url: String) -> Result<Vec<Reply>> {
        let Some(fetcher) = ctx.state.title_fetcher() else {
            return Ok(Vec::new());
        };
        match fetcher.fetch_title(&url) {
            Ok(Some(title)) => Ok(vec![Reply::text(title.trim())]),
            Ok(None) => Ok(Vec::new()),
            Err(error) => {
                tracing::warn!(url = %url, error = %format!("{error:#}"), "page title lookup failed");
                Ok(Vec::new())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub before: String,
    pub after: String,
}

pub struct Substitute {
    pattern: Regex,
}

impl Substitute {
    pub fn new() -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(r"^s/(.+)/(.+)$")?,
        })
    }
}

impl Command for Substitute {
    type Args = Substitution;

    fn descriptor(&self) -> &'static CommandDescriptor {
        &SUBSTITUTE
    }

    fn matches(&self, ctx: &CommandContext<'_>) -> Option<Substitution> {
        let captures = self.pattern.captures(ctx.text())?;
        Some(Substitution {
            before: captures[1].to_string(),
            after: captures[2].to_string(),
        })
    }

    fn execute(&self, ctx: &CommandContext<'_>, args: Substitution) -> Result<Vec<Reply>> {
        let Some((_, last)) = ctx.state.last_message(ctx.actor()) else {
            return Ok(Vec::new());
        };
        let corrected = if last.contains(&args.before) {
            last.replace(&args.before, &args.after)
        } else {
            let loose = RegexBuilder::new(&regex::escape(&args.before))
                .case_insensitive(true)
                .build()?;
            if !loose.is_match(&last) {
                return Ok(Vec::new());
            }
            loose.replace_all(&last, NoExpand(&args.after)).into_owned()
        };
        let name = ctx
            .state
            .resolver()
            .honorific_display_name(ctx.actor(), ctx.conversation_id())?;
        Ok(vec![Reply::text(format!("{name} MEANT to say: {corrected}"))])
    }
}

pub struct DadJoke {
    pattern: Regex,
}

impl DadJoke {
    pub fn new(bot_name: &str) -> Result<Self> {
        Ok(Self {
            pattern: bot_pattern(bot_name, r"^(?:{bot}[:,]?)?\s?dad\s?joke.?$")?,
        })
    }
}

impl Command for DadJoke {
    type Args = ();

    fn descriptor(&self) -> &'static CommandDescriptor {
        &DAD_JOKE
    }

    fn matches(&self, ctx: &CommandContext<'_>) -> Option<()> {
        self.pattern.is_match(ctx.text()).then_some(())
    }

    fn execute(&self, ctx: &CommandContext<'_>, _args: ()) -> Result<Vec<Reply>> {
        let jokes = ctx.state.store().jokes("dad")?;
        let joke = ctx
            .state
            .with_rng(|rng| jokes.choose(rng).map(|joke| joke.joke.clone()));
        Ok(vec![Reply::text(
            joke.unwrap_or_else(|| "I'm fresh out of dad jokes.".to_string()),
        )])
    }
}

/// Replies with an image from the image directory when a catchphrase appears.
pub struct ImageReaction {
    descriptor: &'static CommandDescriptor,
    pattern: Regex,
    images: &'static [&'static str],
}

impl ImageReaction {
    fn new(
        descriptor: &'static CommandDescriptor,
        phrase: &str,
        images: &'static [&'static str],
    ) -> Result<Self> {
        Ok(Self {
            descriptor,
            pattern: Regex::new(&format!(r"(?i)(?:^|\W){phrase}(?:$|\W)"))?,
            images,
        })
    }

    pub fn say_wat() -> Result<Self> {
        Self::new(
            &SAY_WAT,
            "wat",
            &["watduck.jpg", "wathorse.jpg", "wat.jpeg", "watman.jpg"],
        )
    }

    pub fn its_a_trap() -> Result<Self> {
        Self::new(
            &ITS_A_TRAP,
            "it'?s a trap",
            &["hopeitsatrap.jpg", "itsafrappe.jpg", "itsaruse.jpeg", "itsatrap.jpg"],
        )
    }

    pub fn grails() -> Result<Self> {
        Self::new(&GRAILS, "grails", &["grails.png"])
    }

    pub fn good_news() -> Result<Self> {
        Self::new(&GOOD_NEWS, "good news", &["goodnews.jpg"])
    }

    pub fn spoiler_alert() -> Result<Self> {
        Self::new(&SPOILER_ALERT, "spoiler alert", &["Spoilers.jpg"])
    }
}

impl Command for ImageReaction {
    type Args = ();

    fn descriptor(&self) -> &'static CommandDescriptor {
        self.descriptor
    }

    fn matches(&self, ctx: &CommandContext<'_>) -> Option<()> {
        self.pattern.is_match(ctx.text()).then_some(())
    }

    fn execute(&self, ctx: &CommandContext<'_>, _args: ()) -> Result<Vec<Reply>> {
        Ok(pick(ctx, self.images)
            .map(|image| Reply::image(ctx.state.image_path(image)))
            .into_iter()
            .collect())
    }
}

pub struct CleaningLady {
    pattern: Regex,
}

impl CleaningLady {
    pub fn new() -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(r"(?i)(?:^|\W)cleaning lady(?:$|\W)")?,
        })
    }
}

impl Command for CleaningLady {
    type Args = ();

    fn descriptor(&self) -> &'static CommandDescriptor {
        &CLEANING_LADY_DESCRIPTOR
    }

    fn matches(&self, ctx: &CommandContext<'_>) -> Option<()> {
        self.pattern.is_match(ctx.text()).then_some(())
    }

    fn execute(&self, _ctx: &CommandContext<'_>, _args: ()) -> Result<Vec<Reply>> {
        Ok(CLEANING_LADY.iter().copied().map(Reply::text).collect())
    }
}

pub struct WotSwear;

impl Command for WotSwear {
    type Args = ();

    fn descriptor(&self) -> &'static CommandDescriptor {
        &WOT_SWEAR
    }

    fn matches(&self, ctx: &CommandContext<'_>) -> Option<()> {
        ctx.text().to_lowercase().contains("light!").then_some(())
    }

    fn execute(&self, ctx: &CommandContext<'_>, _args: ()) -> Result<Vec<Reply>> {
        Ok(pick(ctx, &SWEARS).map(Reply::text).into_iter().collect())
    }
}
