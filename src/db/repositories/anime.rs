use crate::domain::{AnimeId, RelationType};
use crate::entities::{anime, anime_relations, prelude::*};
use crate::models::anime::{CatalogAnime, RelationEdge};
use anyhow::Result;
use chrono::NaiveDate;
use sea_orm::sea_query::LikeExpr;
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::{debug, info};

pub struct AnimeRepository {
    conn: DatabaseConnection,
}

impl AnimeRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_model(model: anime::Model) -> CatalogAnime {
        CatalogAnime {
            id: AnimeId::new(model.id),
            slug: model.slug,
            title: model.title,
            title_english: model.title_english,
            year: model.year,
            anime_type: model.r#type,
            episode_count: model.episode_count,
            cover_image: model.cover_image,
            average_rating: model.average_rating,
            status: model.status,
            start_date: model
                .start_date
                .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
            studios: model
                .studios
                .and_then(|s| serde_json::from_str(&s).ok())
                .unwrap_or_default(),
        }
    }

    fn to_active_model(anime: &CatalogAnime) -> anime::ActiveModel {
        anime::ActiveModel {
            id: Set(anime.id.value()),
            slug: Set(anime.slug.clone()),
            title: Set(anime.title.clone()),
            title_english: Set(anime.title_english.clone()),
            year: Set(anime.year),
            r#type: Set(anime.anime_type.clone()),
            episode_count: Set(anime.episode_count),
            cover_image: Set(anime.cover_image.clone()),
            average_rating: Set(anime.average_rating),
            status: Set(anime.status.clone()),
            start_date: Set(anime.start_date.map(|d| d.format("%Y-%m-%d").to_string())),
            studios: Set(if anime.studios.is_empty() {
                None
            } else {
                serde_json::to_string(&anime.studios).ok()
            }),
        }
    }

    pub async fn get(&self, id: AnimeId) -> Result<Option<CatalogAnime>> {
        let row = Anime::find_by_id(id.value()).one(&self.conn).await?;
        Ok(row.map(Self::map_model))
    }

    pub async fn get_many(&self, ids: &[AnimeId]) -> Result<Vec<CatalogAnime>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = Anime::find()
            .filter(anime::Column::Id.is_in(ids.iter().map(|id| id.value())))
            .order_by_asc(anime::Column::Id)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(Self::map_model).collect())
    }

    /// Literal substring match on either title; `%` and `_` in the term are
    /// not wildcards.
    ///
    /// `SQLite` `LIKE` only folds ASCII case, so "Ä" does not match "ä".
    /// Candidates are re-checked on their normalized titles afterwards.
    pub async fn search_titles(&self, term: &str, limit: u64) -> Result<Vec<CatalogAnime>> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }

        let rows = Anime::find()
            .filter(
                Condition::any()
                    .add(anime::Column::Title.like(contains_pattern(term)))
                    .add(anime::Column::TitleEnglish.like(contains_pattern(term))),
            )
            .order_by_asc(anime::Column::Id)
            .limit(limit)
            .all(&self.conn)
            .await?;

        debug!(term, hits = rows.len(), "Title search");
        Ok(rows.into_iter().map(Self::map_model).collect())
    }

    /// Edges leaving or entering `id`, all oriented from `id`.
    ///
    /// An incoming `sequel` edge from the prequel's row reads as `prequel` from here.
    pub async fn relations(&self, id: AnimeId) -> Result<Vec<RelationEdge>> {
        let raw = id.value();
        let rows = AnimeRelations::find()
            .filter(
                Condition::any()
                    .add(anime_relations::Column::AnimeId.eq(raw))
                    .add(anime_relations::Column::RelatedAnimeId.eq(raw)),
            )
            .order_by_asc(anime_relations::Column::Id)
            .all(&self.conn)
            .await?;

        let mut edges: Vec<RelationEdge> = Vec::with_capacity(rows.len());
        for row in rows {
            let relation = RelationType::parse(&row.relation_type);
            let edge = if row.anime_id == raw {
                RelationEdge {
                    anime_id: id,
                    related_anime_id: AnimeId::new(row.related_anime_id),
                    relation,
                }
            } else {
                RelationEdge {
                    anime_id: id,
                    related_anime_id: AnimeId::new(row.anime_id),
                    relation: relation.inverse(),
                }
            };

            if edge.related_anime_id != id && !edges.contains(&edge) {
                edges.push(edge);
            }
        }

        Ok(edges)
    }

    async fn upsert_with<C: ConnectionTrait>(conn: &C, anime: &CatalogAnime) -> Result<()> {
        Anime::insert(Self::to_active_model(anime))
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(anime::Column::Id)
                    .update_columns([
                        anime::Column::Slug,
                        anime::Column::Title,
                        anime::Column::TitleEnglish,
                        anime::Column::Year,
                        anime::Column::Type,
                        anime::Column::EpisodeCount,
                        anime::Column::CoverImage,
                        anime::Column::AverageRating,
                        anime::Column::Status,
                        anime::Column::StartDate,
                        anime::Column::Studios,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;

        Ok(())
    }

    async fn add_relation_with<C: ConnectionTrait>(conn: &C, edge: &RelationEdge) -> Result<bool> {
        let inserted = AnimeRelations::insert(anime_relations::ActiveModel {
            anime_id: Set(edge.anime_id.value()),
            related_anime_id: Set(edge.related_anime_id.value()),
            relation_type: Set(edge.relation.as_str().to_string()),
            ..Default::default()
        })
        .on_conflict(
            sea_orm::sea_query::OnConflict::columns([
                anime_relations::Column::AnimeId,
                anime_relations::Column::RelatedAnimeId,
                anime_relations::Column::RelationType,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

        Ok(inserted > 0)
    }

    pub async fn upsert(&self, anime: &CatalogAnime) -> Result<()> {
        Self::upsert_with(&self.conn, anime).await
    }

    /// Stores the edge as given. Duplicate edges are ignored.
    pub async fn add_relation(&self, edge: &RelationEdge) -> Result<bool> {
        Self::add_relation_with(&self.conn, edge).await
    }

    /// Loads a whole catalog in one transaction. Returns `(anime, new edges)`.
    pub async fn import(
        &self,
        entries: &[CatalogAnime],
        edges: &[RelationEdge],
    ) -> Result<(usize, usize)> {
        let txn = self.conn.begin().await?;

        for entry in entries {
            Self::upsert_with(&txn, entry).await?;
        }

        let mut added = 0;
        for edge in edges {
            if Self::add_relation_with(&txn, edge).await? {
                added += 1;
            }
        }

        txn.commit().await?;

        info!(
            anime = entries.len(),
            relations = added,
            "Catalog import committed"
        );
        Ok((entries.len(), added))
    }

    pub async fn count(&self) -> Result<u64> {
        Ok(Anime::find().count(&self.conn).await?)
    }
}

const LIKE_ESCAPE: char = '\\';

/// `%term%` with the term's own wildcards escaped.
fn contains_pattern(term: &str) -> LikeExpr {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped.push('%');
    LikeExpr::new(escaped).escape(LIKE_ESCAPE)
}
