use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use gambit_dispatch::{BotConfig, Clock, Dispatcher};
use gambit_store::{BotStore, SqliteBotStore, Title};
use gambit_types::{InboundMessage, Sender};
use tempfile::TempDir;

const ADMIN: &str = "Admin User";

struct SteppedClock(AtomicU64);

impl Clock for SteppedClock {
    fn now_unix(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

struct Bot {
    _dir: TempDir,
    store: Arc<SqliteBotStore>,
    clock: Arc<SteppedClock>,
    dispatcher: Dispatcher,
}

impl Bot {
    fn start() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(SqliteBotStore::new(dir.path().join("gambit.sqlite")).expect("store"));
        let clock = Arc::new(SteppedClock(AtomicU64::new(1_700_000_000)));
        let config = BotConfig {
            image_dir: PathBuf::from("/srv/gambit/images"),
            admins: vec![ADMIN.to_string()],
            rng_seed: Some(7),
            ..BotConfig::default()
        };
        let dispatcher = Dispatcher::builder(store.clone())
            .config(config)
            .clock(clock.clone())
            .build()
            .expect("dispatcher");
        Self {
            _dir: dir,
            store,
            clock,
            dispatcher,
        }
    }

    fn say(&self, full_name: &str, text: &str) -> Vec<String> {
        let user_id = format!("id-{}", full_name.to_lowercase().replace(' ', "-"));
        let message = InboundMessage::new("room", Sender::new(user_id, full_name), text);
        self.dispatcher
            .dispatch(&message)
            .iter()
            .map(|reply| reply.to_payload())
            .collect()
    }

    /// Registers `full_name` by speaking, then has the admin assign `nickname`.
    fn join(&self, full_name: &str, nickname: &str) {
        self.say(full_name, "hello everyone");
        assert_eq!(
            self.say(ADMIN, &format!("gambit: nickname {full_name} {nickname}")),
            [format!("Gave {full_name} nickname {nickname}")]
        );
    }
}

#[test]
fn integration_karma_is_persisted_and_rate_limited() {
    let bot = Bot::start();
    assert_eq!(bot.say("Brad Johns", "poop++"), ["Gave karma to poop, total: 1"]);
    for expected in 2..=5 {
        assert_eq!(
            bot.say("Brad Johns", "poop++"),
            [format!("Gave karma to poop, total: {expected}")]
        );
    }
    assert_eq!(
        bot.say("Brad Johns", "poop++"),
        ["Be cool! Stop spamming me with karma."]
    );
    assert_eq!(bot.say("Sam Hill", "karma poop"), ["Karma for poop: 5."]);

    bot.clock.0.fetch_add(30, Ordering::SeqCst);
    assert_eq!(bot.say("Brad Johns", "poop--"), ["Took karma from poop, total: 4"]);
    assert_eq!(bot.store.karma_of("POOP").expect("karma"), 4);
}

#[test]
fn integration_debts_round_trip_between_users() {
    let bot = Bot::start();
    bot.join("Alice Smith", "alice");
    bot.join("Bob Jones", "bob");
    bot.store.change_karma("alice", 20).expect("karma");
    bot.store.change_karma("bob", 20).expect("karma");

    assert_eq!(
        bot.say("Alice Smith", "gambit: spot bob 10"),
        ["Spotted bob 10 karma, they now owe you 10"]
    );
    assert_eq!(
        bot.say("Bob Jones", "gambit: spot alice 10"),
        ["Gave 10 karma to alice. You now owe them 0 karma"]
    );
    assert_eq!(bot.store.karma_of("alice").expect("karma"), 20);
    assert_eq!(bot.store.karma_of("bob").expect("karma"), 20);
    assert_eq!(
        bot.say("Alice Smith", "gambit: show debts"),
        ["Nobody owes anybody anything."]
    );
    assert_eq!(
        bot.say("Alice Smith", "gambit: spot bob 50"),
        ["You're a bit too generous, friend. Don't lend what you don't have."]
    );
}

#[test]
fn integration_honorifics_crown_the_richest_user() {
    let bot = Bot::start();
    bot.join("Alice Smith", "alice");
    bot.join("Bob Jones", "bob");
    bot.store.change_karma("alice", 100).expect("karma");
    bot.store.change_karma("bob", 100).expect("karma");

    assert_eq!(
        bot.say("Carol King", "alice++"),
        ["Gave karma to King alice, total: 101"]
    );
    let titles = ["Alice Smith", "Bob Jones"].map(|name| {
        bot.store
            .find_user_by_name("room", name)
            .expect("lookup")
            .and_then(|user| user.title)
    });
    assert_eq!(titles, [Some(Title::King), Some(Title::Lord)]);

    bot.store.change_karma("bob", 10).expect("karma");
    assert_eq!(bot.say("Carol King", "bob++"), ["Gave karma to King bob, total: 111"]);
}

#[test]
fn integration_vote_tie_is_broken_by_voter_karma() {
    let bot = Bot::start();
    bot.join("Alice Smith", "alice");
    bot.join("Bob Jones", "bob");
    bot.store.change_karma("alice", 2).expect("karma");
    bot.store.change_karma("bob", 8).expect("karma");

    assert_eq!(
        bot.say("Alice Smith", "gambit: start open vote lunch?"),
        ["Vote Started: lunch?"]
    );
    bot.say("Alice Smith", "gambit: add vote option tacos");
    bot.say("Bob Jones", "gambit: add vote option pizza");
    assert_eq!(bot.say("Alice Smith", "gambit: vote for tacos"), ["alice voted for tacos"]);
    assert_eq!(bot.say("Bob Jones", "gambit: vote for pizza"), ["bob voted for pizza"]);
    assert_eq!(
        bot.say("Alice Smith", "gambit: end vote"),
        ["The votes are in! The winner is: pizza"]
    );
    assert!(bot.say("Alice Smith", "gambit: show votes").is_empty());
}

#[test]
fn integration_command_privileges_survive_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("gambit.sqlite");
    let build = || {
        let store = Arc::new(SqliteBotStore::new(&path).expect("store"));
        let config = BotConfig {
            admins: vec![ADMIN.to_string()],
            rng_seed: Some(1),
            ..BotConfig::default()
        };
        Dispatcher::builder(store).config(config).build().expect("dispatcher")
    };
    let say = |dispatcher: &Dispatcher, full_name: &str, text: &str| {
        let message = InboundMessage::new("room", Sender::new(full_name, full_name), text);
        dispatcher
            .dispatch(&message)
            .iter()
            .map(|reply| reply.to_payload())
            .collect::<Vec<_>>()
    };

    let first = build();
    assert_eq!(
        say(&first, ADMIN, "gambit: set command privilege high-low 3"),
        ["Set privilege of high-low to 3"]
    );
    drop(first);

    let second = build();
    assert_eq!(
        say(&second, "Brad Johns", "gambit: get command privilege high-low"),
        ["Privilege for high-low is 3"]
    );
    assert!(say(&second, "Brad Johns", "gambit: high-low 1 high").is_empty());
}
