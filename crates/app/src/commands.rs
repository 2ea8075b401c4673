//! Terminal commands

use planit_core::{series, Error, Result, SeriesType, VoteValue};

pub const HELP: &str = "\
Commands:
  name <display name>     sign in (or rename)
  signout                 forget this device's identity
  create [series]         create a room (fibonacci, modified-fibonacci, tshirt, powers-of-2)
  join <code|link>        join a room
  vote <value>            cast or change your vote
  reveal                  show everyone's votes (admin)
  reset                   start a new round (admin)
  series                  list the catalog series
  series <type>           switch to a catalog series (admin)
  custom <v1, v2, ...>    switch to a custom series (admin)
  stats                   statistics for the revealed round
  users                   list participants
  link                    print the share link
  leave                   leave the room
  help                    show this text
  quit                    exit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SignIn(String),
    SignOut,
    Create(SeriesType),
    Join(String),
    Vote(VoteValue),
    Reveal,
    Reset,
    ListSeries,
    Series(SeriesType),
    Custom(Vec<VoteValue>),
    Stats,
    Users,
    Link,
    Leave,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line. Blank lines give `None`.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "name" => Command::SignIn(required(rest, "name <display name>")?.to_string()),
            "signout" => Command::SignOut,
            "create" if rest.is_empty() => Command::Create(SeriesType::Fibonacci),
            "create" => Command::Create(series_type(rest)?),
            "join" => Command::Join(required(rest, "join <code|link>")?.to_string()),
            "vote" => Command::Vote(VoteValue::from_input(required(rest, "vote <value>")?)),
            "reveal" => Command::Reveal,
            "reset" => Command::Reset,
            "series" if rest.is_empty() => Command::ListSeries,
            "series" => Command::Series(series_type(rest)?),
            "custom" => Command::Custom(series::parse_custom(required(
                rest,
                "custom <v1, v2, ...>",
            )?)),
            "stats" => Command::Stats,
            "users" => Command::Users,
            "link" => Command::Link,
            "leave" => Command::Leave,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(Error::validation(format!("Unknown command '{}'", other))),
        };
        Ok(Some(command))
    }
}

/// One line per catalog series: tag, name, values and whether it averages
pub fn series_listing() -> String {
    series::predefined()
        .iter()
        .map(|s| {
            let values: Vec<String> = s.values.iter().map(ToString::to_string).collect();
            let kind = if series::is_numeric(&s.values) { "numeric" } else { "labels" };
            format!(
                "  {:<20} {} [{}] ({})",
                s.series_type.tag(),
                s.name,
                values.join(", "),
                kind
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn required<'a>(rest: &'a str, usage: &str) -> Result<&'a str> {
    if rest.is_empty() {
        return Err(Error::validation(format!("Usage: {}", usage)));
    }
    Ok(rest)
}

fn series_type(tag: &str) -> Result<SeriesType> {
    SeriesType::from_tag(tag)
        .ok_or_else(|| Error::validation(format!("Unknown series '{}'", tag)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Command {
        Command::parse(line).unwrap().unwrap()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse("name  Ada Lovelace "), Command::SignIn("Ada Lovelace".into()));
        assert_eq!(parse("create"), Command::Create(SeriesType::Fibonacci));
        assert_eq!(parse("CREATE tshirt"), Command::Create(SeriesType::Tshirt));
        assert_eq!(parse("join ab12cd"), Command::Join("ab12cd".into()));
        assert_eq!(parse("vote 13"), Command::Vote(VoteValue::Numeric(13.0)));
        assert_eq!(parse("vote XL"), Command::Vote("XL".into()));
        assert_eq!(
            parse("custom 1, 2, ?"),
            Command::Custom(vec![1.0.into(), 2.0.into(), "?".into()])
        );
        assert_eq!(parse("series"), Command::ListSeries);
        assert_eq!(parse("series tshirt"), Command::Series(SeriesType::Tshirt));
        assert_eq!(parse("exit"), Command::Quit);
        assert_eq!(Command::parse("   ").unwrap(), None);
    }

    #[test]
    fn test_series_listing_marks_label_series() {
        let listing = series_listing();
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines.len(), series::predefined().len());
        assert!(lines[0].contains("Fibonacci [0.5, 1, 2, 3, 5, 8, 13, 21] (numeric)"));
        let tshirt = lines.iter().find(|l| l.contains("T-Shirt Sizes")).unwrap();
        assert!(tshirt.ends_with("[XS, S, M, L, XL, XXL] (labels)"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(Command::parse("vote"), Err(Error::Validation(_))));
        assert!(matches!(Command::parse("series planets"), Err(Error::Validation(_))));
        assert!(matches!(Command::parse("dance"), Err(Error::Validation(_))));
    }
}
