use std::path::Path;
use std::sync::{Arc, RwLock as StdRwLock};

use async_trait::async_trait;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, FuzzyTermQuery, Occur, PhraseQuery, Query, QueryParser, RegexQuery, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, Value, FAST, STORED, STRING, TEXT};
use tantivy::snippet::SnippetGenerator;
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tokio::sync::Mutex as AsyncMutex;
use vault_contracts::{IndexUpdate, SearchHit, SearchIndex, SearchResults};
use vault_model::{Result, SearchState, VaultError};

const MAX_HITS: usize = 20;

#[derive(Clone)]
struct Fields {
    path: tantivy::schema::Field,
    title: tantivy::schema::Field,
    body: tantivy::schema::Field,
    tags: tantivy::schema::Field,
    wikilinks: tantivy::schema::Field,
}

/// Full-text index over a vault's Markdown files, backed by `tantivy`
/// (SPEC_FULL.md §4.5 grounding note — `tantivy` is adopted from the
/// example pack's markdown/search tooling since the teacher repo has no
/// full-text search code of its own). `tags`/`wikilinks` use the `raw`
/// tokenizer for exact-match facet behavior; `title`/`body` use tantivy's
/// default tokenizer.
pub struct TantivySearchIndex {
    index: StdRwLock<Index>,
    writer: AsyncMutex<IndexWriter>,
    reader: StdRwLock<IndexReader>,
    fields: Fields,
    state: StdRwLock<SearchState>,
}

fn build_schema() -> (Schema, Fields) {
    let mut builder = Schema::builder();
    let raw_exact = TextOptions::default().set_indexing_options(
        TextFieldIndexing::default()
            .set_tokenizer("raw")
            .set_index_option(IndexRecordOption::Basic),
    );

    let path = builder.add_text_field("path", STRING | STORED | FAST);
    let title = builder.add_text_field("title", TEXT | STORED);
    let body = builder.add_text_field("body", TEXT);
    let tags = builder.add_text_field("tags", raw_exact.clone() | STORED);
    let wikilinks = builder.add_text_field("wikilinks", raw_exact | STORED);

    (
        builder.build(),
        Fields {
            path,
            title,
            body,
            tags,
            wikilinks,
        },
    )
}

impl TantivySearchIndex {
    pub fn open_or_create(index_path: &Path) -> Result<Arc<Self>> {
        std::fs::create_dir_all(index_path).map_err(|e| VaultError::Search(e.to_string()))?;
        let (schema, fields) = build_schema();

        let index = if tantivy::Index::exists(&tantivy::directory::MmapDirectory::open(index_path).map_err(
            |e| VaultError::Search(e.to_string()),
        )?)
        .unwrap_or(false)
        {
            Index::open_in_dir(index_path).map_err(|e| VaultError::Search(e.to_string()))?
        } else {
            Index::create_in_dir(index_path, schema).map_err(|e| VaultError::Search(e.to_string()))?
        };

        let writer = index
            .writer(50_000_000)
            .map_err(|e| VaultError::Search(e.to_string()))?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()
            .map_err(|e: tantivy::TantivyError| VaultError::Search(e.to_string()))?;

        Ok(Arc::new(Self {
            index: StdRwLock::new(index),
            writer: AsyncMutex::new(writer),
            reader: StdRwLock::new(reader),
            fields,
            state: StdRwLock::new(SearchState::Ready),
        }))
    }

    fn searcher(&self) -> tantivy::Searcher {
        self.reader.read().unwrap().searcher()
    }

    /// Runs `query` and assembles hits. `snippet_fields` names the text
    /// fields worth highlighting for this query kind (body/title for free
    /// text, empty for exact tag/wikilink lookups where a snippet would
    /// just echo the whole term back).
    fn run_query(&self, query: &dyn Query, snippet_fields: &[(Field, &'static str)]) -> Result<SearchResults> {
        let searcher = self.searcher();
        let top_docs = searcher
            .search(query, &TopDocs::with_limit(MAX_HITS))
            .map_err(|e| VaultError::Search(e.to_string()))?;

        let generators: Vec<(&'static str, SnippetGenerator)> = snippet_fields
            .iter()
            .filter_map(|&(field, name)| {
                SnippetGenerator::create(&searcher, query, field)
                    .ok()
                    .map(|g| (name, g))
            })
            .collect();

        let hits: Vec<SearchHit> = top_docs
            .into_iter()
            .filter_map(|(score, address)| {
                let retrieved: TantivyDocument = searcher.doc(address).ok()?;
                let path = field_text(&retrieved, self.fields.path)?;
                let title = field_text(&retrieved, self.fields.title).unwrap_or_default();

                let mut matched_fields = Vec::new();
                let mut highlights = Vec::new();
                for (name, generator) in &generators {
                    let snippet = generator.snippet_from_doc(&retrieved);
                    if !snippet.highlighted().is_empty() {
                        matched_fields.push(name.to_string());
                        for range in snippet.highlighted() {
                            highlights.push(vault_contracts::HighlightSpan {
                                field: name.to_string(),
                                start: range.start,
                                end: range.end,
                            });
                        }
                    }
                }

                Some(SearchHit {
                    path,
                    title,
                    score,
                    matched_fields,
                    highlights,
                })
            })
            .collect();

        Ok(SearchResults {
            total: hits.len(),
            hits,
        })
    }

    fn exact_term_query(&self, field: tantivy::schema::Field, value: &str) -> TermQuery {
        TermQuery::new(Term::from_field_text(field, value), IndexRecordOption::Basic)
    }
}

fn field_text(document: &TantivyDocument, field: tantivy::schema::Field) -> Option<String> {
    document
        .get_first(field)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

#[async_trait]
impl SearchIndex for TantivySearchIndex {
    async fn by_text(&self, query: &str) -> Result<SearchResults> {
        if query.trim().is_empty() {
            return Ok(SearchResults::empty());
        }
        let index = self.index.read().unwrap();
        let parser = QueryParser::for_index(&index, vec![self.fields.body, self.fields.title]);
        let parsed = parser.parse_query(query).map_err(|e| VaultError::Search(e.to_string()))?;
        self.run_query(parsed.as_ref(), &[(self.fields.body, "body"), (self.fields.title, "title")])
    }

    async fn by_title(&self, query: &str) -> Result<SearchResults> {
        if query.trim().is_empty() {
            return Ok(SearchResults::empty());
        }
        let index = self.index.read().unwrap();
        let parser = QueryParser::for_index(&index, vec![self.fields.title]);
        let parsed = parser.parse_query(query).map_err(|e| VaultError::Search(e.to_string()))?;
        self.run_query(parsed.as_ref(), &[(self.fields.title, "title")])
    }

    async fn by_tag(&self, tag: &str) -> Result<SearchResults> {
        if tag.is_empty() {
            return Ok(SearchResults::empty());
        }
        self.run_query(&self.exact_term_query(self.fields.tags, tag), &[])
    }

    async fn by_tags_all(&self, tags: &[String]) -> Result<SearchResults> {
        if tags.is_empty() {
            return Ok(SearchResults::empty());
        }
        let clauses: Vec<(Occur, Box<dyn Query>)> = tags
            .iter()
            .map(|t| (Occur::Must, Box::new(self.exact_term_query(self.fields.tags, t)) as Box<dyn Query>))
            .collect();
        self.run_query(&BooleanQuery::new(clauses), &[])
    }

    async fn by_tags_any(&self, tags: &[String]) -> Result<SearchResults> {
        if tags.is_empty() {
            return Ok(SearchResults::empty());
        }
        let clauses: Vec<(Occur, Box<dyn Query>)> = tags
            .iter()
            .map(|t| (Occur::Should, Box::new(self.exact_term_query(self.fields.tags, t)) as Box<dyn Query>))
            .collect();
        self.run_query(&BooleanQuery::new(clauses), &[])
    }

    async fn by_wikilink(&self, target: &str) -> Result<SearchResults> {
        if target.is_empty() {
            return Ok(SearchResults::empty());
        }
        self.run_query(&self.exact_term_query(self.fields.wikilinks, target), &[])
    }

    async fn by_wikilinks_all(&self, targets: &[String]) -> Result<SearchResults> {
        if targets.is_empty() {
            return Ok(SearchResults::empty());
        }
        let clauses: Vec<(Occur, Box<dyn Query>)> = targets
            .iter()
            .map(|t| (Occur::Must, Box::new(self.exact_term_query(self.fields.wikilinks, t)) as Box<dyn Query>))
            .collect();
        self.run_query(&BooleanQuery::new(clauses), &[])
    }

    async fn by_wikilinks_any(&self, targets: &[String]) -> Result<SearchResults> {
        if targets.is_empty() {
            return Ok(SearchResults::empty());
        }
        let clauses: Vec<(Occur, Box<dyn Query>)> = targets
            .iter()
            .map(|t| (Occur::Should, Box::new(self.exact_term_query(self.fields.wikilinks, t)) as Box<dyn Query>))
            .collect();
        self.run_query(&BooleanQuery::new(clauses), &[])
    }

    async fn fuzzy(&self, query: &str, distance: u8) -> Result<SearchResults> {
        if query.trim().is_empty() {
            return Ok(SearchResults::empty());
        }
        let term = Term::from_field_text(self.fields.body, query);
        let fuzzy_query = FuzzyTermQuery::new(term, distance, true);
        self.run_query(&fuzzy_query, &[(self.fields.body, "body")])
    }

    async fn phrase(&self, phrase: &str) -> Result<SearchResults> {
        let words: Vec<&str> = phrase.split_whitespace().collect();
        if words.len() < 2 {
            return Ok(SearchResults::empty());
        }
        let terms: Vec<Term> = words.iter().map(|w| Term::from_field_text(self.fields.body, w)).collect();
        self.run_query(&PhraseQuery::new(terms), &[(self.fields.body, "body")])
    }

    async fn prefix(&self, prefix: &str) -> Result<SearchResults> {
        if prefix.trim().is_empty() {
            return Ok(SearchResults::empty());
        }
        let pattern = format!("{}.*", regex::escape(prefix));
        let query = RegexQuery::from_pattern(&pattern, self.fields.body).map_err(|e| VaultError::Search(e.to_string()))?;
        self.run_query(&query, &[(self.fields.body, "body")])
    }

    async fn combined(&self, text: Option<&str>, tags: &[String], wikilinks: &[String]) -> Result<SearchResults> {
        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        let has_text = text.map(|t| !t.trim().is_empty()).unwrap_or(false);

        if let Some(text) = text.filter(|t| !t.trim().is_empty()) {
            let index = self.index.read().unwrap();
            let parser = QueryParser::for_index(&index, vec![self.fields.body, self.fields.title]);
            let parsed = parser.parse_query(text).map_err(|e| VaultError::Search(e.to_string()))?;
            clauses.push((Occur::Must, parsed));
        }
        for tag in tags {
            clauses.push((Occur::Must, Box::new(self.exact_term_query(self.fields.tags, tag))));
        }
        for link in wikilinks {
            clauses.push((Occur::Must, Box::new(self.exact_term_query(self.fields.wikilinks, link))));
        }

        if clauses.is_empty() {
            return Ok(SearchResults::empty());
        }
        let snippet_fields: &[(Field, &'static str)] =
            if has_text { &[(self.fields.body, "body"), (self.fields.title, "title")] } else { &[] };
        self.run_query(&BooleanQuery::new(clauses), snippet_fields)
    }

    async fn index_document(&self, path: &str, title: &str, tags: &[String], wikilinks: &[String], body: &str) -> Result<()> {
        let mut writer = self.writer.lock().await;
        writer.delete_term(Term::from_field_text(self.fields.path, path));

        let mut document = doc!(
            self.fields.path => path,
            self.fields.title => title,
            self.fields.body => body,
        );
        for tag in tags {
            document.add_text(self.fields.tags, tag);
        }
        for link in wikilinks {
            document.add_text(self.fields.wikilinks, link);
        }
        writer.add_document(document).map_err(|e| VaultError::Search(e.to_string()))?;
        writer.commit().map_err(|e| VaultError::Search(e.to_string()))?;
        Ok(())
    }

    async fn remove_document(&self, path: &str) -> Result<()> {
        let mut writer = self.writer.lock().await;
        writer.delete_term(Term::from_field_text(self.fields.path, path));
        writer.commit().map_err(|e| VaultError::Search(e.to_string()))?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut writer = self.writer.lock().await;
        writer.delete_all_documents().map_err(|e| VaultError::Search(e.to_string()))?;
        writer.commit().map_err(|e| VaultError::Search(e.to_string()))?;
        Ok(())
    }

    async fn notify_update(&self, update: IndexUpdate) {
        match update {
            IndexUpdate::Incremental => {}
            IndexUpdate::Rebuild => {
                let mut state = self.state.write().unwrap();
                if matches!(*state, SearchState::Error | SearchState::Initializing) {
                    *state = SearchState::Ready;
                }
            }
        }
    }

    fn state(&self) -> SearchState {
        *self.state.read().unwrap()
    }
}
