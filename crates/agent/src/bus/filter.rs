use std::collections::HashMap;

use regex::Regex;

/// Topic patterns per consumed stream.
#[derive(Debug, Default)]
pub(crate) struct TopicFilters {
    by_stream: HashMap<String, Vec<Regex>>,
}

impl TopicFilters {
    pub fn add(&mut self, stream: &str, pattern: &str) -> Result<(), regex::Error> {
        let re = Regex::new(pattern)?;
        self.push(stream, re);
        Ok(())
    }

    pub fn push(&mut self, stream: &str, re: Regex) {
        self.by_stream.entry(stream.to_string()).or_default().push(re);
    }

    pub fn consumes(&self, stream: &str) -> bool {
        self.by_stream.contains_key(stream)
    }

    pub fn accepts(&self, stream: &str, topic: &str) -> bool {
        self.by_stream
            .get(stream)
            .is_some_and(|patterns| patterns.iter().any(|re| re.is_match(topic)))
    }

    pub fn consumed(&self) -> Vec<(String, Vec<String>)> {
        self.by_stream
            .iter()
            .map(|(s, res)| (s.clone(), res.iter().map(|r| r.as_str().to_string()).collect()))
            .collect()
    }
}
