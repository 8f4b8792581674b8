//! Likes on videos, comments and tweets.

use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::ids::EntityId;
use crate::security::Actor;
use crate::store::pairs::{self, LikeTarget};
use crate::store::{Collection, Store, exists};
use crate::views::{JoinKind, Pipeline, Sort};

use super::videos::{VideoView, with_video_view};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LikeStatus {
    Liked,
    Unliked,
}

impl LikeStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Liked => "liked",
            Self::Unliked => "unliked",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeOutcome {
    pub status: LikeStatus,
}

fn collection_of(target: LikeTarget) -> Collection {
    match target {
        LikeTarget::Video => Collection::Videos,
        LikeTarget::Comment => Collection::Comments,
        LikeTarget::Tweet => Collection::Tweets,
    }
}

/// Likes `target_id` for the actor, or removes an existing like.
pub fn toggle(
    store: &Store,
    actor: &Actor,
    target: LikeTarget,
    target_id: &EntityId,
) -> ApiResult<LikeOutcome> {
    let liked_by = actor.require()?;
    store.with_tx(|tx| {
        if !exists(tx, collection_of(target), target_id)? {
            return Err(ApiError::not_found(format!(
                "{} not found with this {} id",
                target.kind(),
                target.kind()
            )));
        }
        let status = if pairs::toggle_like(tx, liked_by, target, target_id)? {
            LikeStatus::Liked
        } else {
            LikeStatus::Unliked
        };
        Ok(LikeOutcome { status })
    })
}

/// Videos the actor has liked, most recent like first. Likes pointing at a
/// deleted video are skipped.
pub fn liked_videos(store: &Store, actor: &Actor) -> ApiResult<Vec<VideoView>> {
    let liked_by = actor.require()?;
    let pipeline = with_video_view(
        Pipeline::from("likes", "l").join(JoinKind::Inner, "videos", "v", "v.id = l.target_id"),
    )
    .match_eq("l.target_kind", LikeTarget::Video.kind().to_string())
    .match_id("l.liked_by", liked_by)
    .sort(Sort::newest_first("l.created_at"));
    store.with_conn(|conn| Ok(pipeline.run(conn, VideoView::from_row)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{comments, fixtures, tweets};

    #[test]
    fn toggling_any_target_alternates() {
        let store = fixtures::store();
        let ada = fixtures::user(&store, "ada");
        let actor = fixtures::actor(&ada);
        let video = fixtures::video(&store, &ada, "clip");
        let comment = comments::add(&store, &actor, &video, Some("nice")).unwrap().id;
        let tweet = tweets::create(&store, &actor, Some("hello")).unwrap().id;

        for (target, id) in [
            (LikeTarget::Video, &video),
            (LikeTarget::Comment, &comment),
            (LikeTarget::Tweet, &tweet),
        ] {
            for round in 1..=3 {
                let outcome = toggle(&store, &actor, target, id).unwrap();
                let expected = if round % 2 == 1 {
                    LikeStatus::Liked
                } else {
                    LikeStatus::Unliked
                };
                assert_eq!(outcome.status, expected);
            }
        }
    }

    #[test]
    fn missing_target_is_not_found() {
        let store = fixtures::store();
        let ada = fixtures::user(&store, "ada");
        let video = fixtures::video(&store, &ada, "clip");
        // A video id is not a tweet id.
        let err = toggle(&store, &fixtures::actor(&ada), LikeTarget::Tweet, &video).unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert_eq!(err.to_string(), "tweet not found with this tweet id");
    }

    #[test]
    fn liked_videos_lists_newest_like_first_and_skips_deleted() {
        let store = fixtures::store();
        let ada = fixtures::user(&store, "ada");
        let bob = fixtures::user(&store, "bob");
        let actor = fixtures::actor(&bob);
        let first = fixtures::video(&store, &ada, "first");
        let second = fixtures::video(&store, &ada, "second");
        let doomed = fixtures::video(&store, &ada, "doomed");

        toggle(&store, &actor, LikeTarget::Video, &second).unwrap();
        toggle(&store, &actor, LikeTarget::Video, &first).unwrap();
        toggle(&store, &actor, LikeTarget::Video, &doomed).unwrap();
        toggle(&store, &fixtures::actor(&ada), LikeTarget::Video, &second).unwrap();
        store
            .with_conn(|conn| Ok(crate::store::delete(conn, Collection::Videos, &doomed)?))
            .unwrap();

        let liked = liked_videos(&store, &actor).unwrap();
        let titles: Vec<_> = liked.iter().map(|v| v.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "second"]);
        assert_eq!(liked[0].owner.as_ref().unwrap().username, "ada");
    }

    #[test]
    fn anonymous_actor_cannot_like() {
        let store = fixtures::store();
        let ada = fixtures::user(&store, "ada");
        let video = fixtures::video(&store, &ada, "clip");
        let err = toggle(&store, &Actor::anonymous(), LikeTarget::Video, &video).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        assert!(matches!(
            liked_videos(&store, &Actor::anonymous()),
            Err(ApiError::Forbidden(_))
        ));
    }
}
