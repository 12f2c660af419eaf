use crate::core::config::data::Config;

impl Config {
    pub fn print_all(&self) {
        let settings = self.sync_settings();
        println!("Current configuration:");
        println!("  base-url: {}", self.base_url());
        match self.token() {
            Some(_) => println!("  token: set (from ${})", self.token_env()),
            None => println!("  token: (unset, export ${})", self.token_env()),
        }
        println!("  messages-per-page: {}", settings.messages_per_page);
        println!("  conversations-per-page: {}", settings.conversations_per_page);
        println!(
            "  stream-throttle: {}ms",
            settings.stream_throttle.as_millis()
        );
        println!(
            "  switch-debounce: {}ms",
            settings.switch_debounce.as_millis()
        );
        println!("  settle-delay: {}ms", settings.settle_delay.as_millis());
        println!(
            "  title-poll: {} attempts every {}ms",
            settings.title_poll.attempts,
            settings.title_poll.interval.as_millis()
        );
        println!(
            "  title-reveal: {}ms per character",
            self.reveal_timing().step.as_millis()
        );
    }
}
