//! Tests for core types

#[cfg(test)]
mod tests {
    use super::super::error::BotError;
    use super::super::types::*;
    use chrono::Utc;

    fn quote(book: &str, market: MarketKind, subject: &str, side: Option<&str>, line: Option<f64>, price: f64) -> OddsQuote {
        OddsQuote {
            book: book.to_string(),
            market,
            subject: subject.to_string(),
            side: side.map(|s| s.to_string()),
            line,
            price,
        }
    }

    fn create_test_game() -> GameRecord {
        GameRecord {
            id: "g1".to_string(),
            sport: "americanfootball_nfl".to_string(),
            home: "Bears".to_string(),
            away: "Packers".to_string(),
            start: Utc::now(),
            books: vec![BookQuotes {
                book: "draftkings".to_string(),
                quotes: vec![
                    quote("draftkings", MarketKind::Moneyline, "Bears", None, None, 2.10),
                    quote("draftkings", MarketKind::Moneyline, "Packers", None, None, 1.75),
                    quote("draftkings", MarketKind::Spread, "Bears", None, Some(3.5), 1.91),
                    quote("draftkings", MarketKind::Spread, "Packers", None, Some(-3.5), 1.91),
                    quote("draftkings", MarketKind::Total, "Over", Some("Over"), Some(44.5), 1.91),
                    quote("draftkings", MarketKind::Total, "Under", Some("Under"), Some(44.5), 1.91),
                ],
            }],
        }
    }

    #[test]
    fn test_market_kind_from_api_key() {
        assert_eq!(MarketKind::from_api_key("h2h"), Some(MarketKind::Moneyline));
        assert_eq!(MarketKind::from_api_key("spreads"), Some(MarketKind::Spread));
        assert_eq!(MarketKind::from_api_key("totals"), Some(MarketKind::Total));
        assert_eq!(MarketKind::from_api_key("player_pass_yds"), Some(MarketKind::PlayerProp));
        assert_eq!(MarketKind::from_api_key("outrights"), None);
    }

    #[test]
    fn test_market_kind_serialization() {
        assert_eq!(serde_json::to_string(&MarketKind::PlayerProp).unwrap(), "\"player_prop\"");
    }

    #[test]
    fn test_game_lookups() {
        let game = create_test_game();
        assert_eq!(game.spread_for("Bears"), Some(3.5));
        assert_eq!(game.total_line(), Some(44.5));
        assert_eq!(game.moneyline_for("Packers"), Some(1.75));
        assert_eq!(game.matchup(), "Packers @ Bears");
        assert!(game.has_odds());
    }

    #[test]
    fn test_game_without_books() {
        let mut game = create_test_game();
        game.books.clear();
        assert!(!game.has_odds());
        assert_eq!(game.spread_for("Bears"), None);
        assert_eq!(game.total_line(), None);
    }

    #[test]
    fn test_wager_estimate_valid() {
        let w = WagerEstimate::new("Bears +3.5", 0.6, 1.91).unwrap();
        assert_eq!(w.description, "Bears +3.5");
        assert_eq!(w.confidence, 0.6);
    }

    #[test]
    fn test_wager_estimate_rejects_bad_odds() {
        assert!(matches!(WagerEstimate::new("x", 0.6, 1.0), Err(BotError::InvalidOdds(_))));
        assert!(matches!(WagerEstimate::new("x", 0.6, f64::NAN), Err(BotError::InvalidOdds(_))));
    }

    #[test]
    fn test_wager_estimate_rejects_bad_confidence() {
        assert!(matches!(WagerEstimate::new("x", 1.2, 2.0), Err(BotError::InvalidConfidence(_))));
        assert!(matches!(WagerEstimate::new("x", -0.1, 2.0), Err(BotError::InvalidConfidence(_))));
    }

    #[test]
    fn test_grade_display() {
        assert_eq!(Grade::A.to_string(), "A");
        assert_eq!(Grade::BPlus.to_string(), "B+");
        assert_eq!(Grade::F, "F");
        assert_eq!(serde_json::to_string(&Grade::BPlus).unwrap(), "\"B+\"");
    }

    #[test]
    fn test_grade_order_best_is_highest() {
        assert!(Grade::A > Grade::BPlus);
        assert!(Grade::BPlus > Grade::B);
        assert!(Grade::B > Grade::C);
        assert!(Grade::C > Grade::F);
        let best = [Grade::C, Grade::A, Grade::F].into_iter().max();
        assert_eq!(best, Some(Grade::A));
    }
}
