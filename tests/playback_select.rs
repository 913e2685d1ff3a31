// tests/playback_select.rs
use vod_relay_client::playback::{
    split_groups, Episode, EpisodeGroup, FirstTieBreak, PlaybackSourceSelector, ScoreWeights,
};

const TWO_MIRRORS: &str = "第01集$http://a.com/1.mp4#第02集$http://a.com/2.mp4$$$第01集$https://b.com/1.m3u8#第02集$https://b.com/2.m3u8";

#[test]
fn https_m3u8_mirror_wins() {
    // No tie to break, so the default random tie-breaker is irrelevant.
    let sel = PlaybackSourceSelector::default();
    for _ in 0..20 {
        let eps = sel.select_episodes(Some(TWO_MIRRORS));
        assert_eq!(
            eps,
            vec![
                Episode::new("第01集", "https://b.com/1.m3u8"),
                Episode::new("第02集", "https://b.com/2.m3u8"),
            ]
        );
    }
}

#[test]
fn empty_or_absent_field_means_nothing_to_play() {
    let sel = PlaybackSourceSelector::default();
    assert!(sel.select_episodes(Some("")).is_empty());
    assert!(sel.select_episodes(Some("  ")).is_empty());
    assert!(sel.select_episodes(None).is_empty());
}

#[test]
fn malformed_entry_is_dropped() {
    let g = EpisodeGroup::parse("ep1NoDelimiterHere#第02集$http://x/2.mp4");
    assert_eq!(g.episodes, vec![Episode::new("第02集", "http://x/2.mp4")]);
}

#[test]
fn clean_segments_reserialize_unchanged() {
    for seg in split_groups(TWO_MIRRORS) {
        assert_eq!(EpisodeGroup::parse(seg).to_segment(), seg);
    }
}

#[test]
fn custom_weights_can_flip_the_choice() {
    // Heavy plain-http bonus (negative penalty) outweighs the m3u8 bonus.
    let weights = ScoreWeights {
        plain_http_penalty: -20,
        ..ScoreWeights::default()
    };
    let eps = PlaybackSourceSelector::new(weights)
        .with_tie_break(FirstTieBreak)
        .select_episodes(Some(TWO_MIRRORS));
    assert_eq!(eps[0].url, "http://a.com/1.mp4");
}

#[test]
fn equal_mirrors_pick_first_with_deterministic_tie_break() {
    let raw = "1$https://a/1.m3u8$$$1$https://b/1.m3u8";
    let sel = PlaybackSourceSelector::default().with_tie_break(FirstTieBreak);
    assert_eq!(sel.select_episodes(Some(raw))[0].url, "https://a/1.m3u8");

    let ranked = sel.rank_groups(raw);
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].score, ranked[1].score);
}

#[test]
fn offline_mirror_text_does_not_hide_playable_group() {
    let sel = PlaybackSourceSelector::default();
    let eps = sel.select_episodes(Some("HD1080P.m3u8 mirror offline$$$第01集$https://b.com/1.mp4"));
    assert_eq!(eps, vec![Episode::new("第01集", "https://b.com/1.mp4")]);

    let eps = PlaybackSourceSelector::default()
        .with_tie_break(FirstTieBreak)
        .select_episodes(Some("x.m3u8$$$第01集$https://b.com/1.mp4"));
    assert_eq!(eps, vec![Episode::new("第01集", "https://b.com/1.mp4")]);
}
