//! PubMed search provider implementation using E-utilities API.

use async_trait::async_trait;
use quick_xml::de::from_str;
use quick_xml::events::Event;
use quick_xml::{Reader, Writer};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ProviderConfig;
use crate::models::{Record, RecordBuilder, RecordId};
use crate::sources::{ProviderError, SearchProvider};
use crate::utils::HttpClient;

/// Access type reported for articles with a PubMed Central copy
const ACCESS_FREE: &str = "Free (PMC)";
const ACCESS_SUBSCRIPTION: &str = "Subscription";

/// Elements whose text PubMed decorates with inline markup (`<i>`, `<sup>`, MathML)
const MIXED_CONTENT: &[&[u8]] = &[b"ArticleTitle", b"AbstractText", b"Keyword"];

/// One page of an esearch response
#[derive(Debug, Clone, PartialEq, Eq)]
struct SearchPage {
    /// Total number of hits reported by PubMed
    count: usize,
    ids: Vec<RecordId>,
}

/// PubMed search provider
///
/// Uses NCBI E-utilities: `esearch` pages through every matching PMID, and
/// `efetch` retrieves article detail in fixed-size chunks.
#[derive(Debug, Clone)]
pub struct PubMedProvider {
    client: Arc<HttpClient>,
    settings: ProviderConfig,
}

impl PubMedProvider {
    /// Create a new PubMed provider with default settings
    pub fn new() -> Result<Self, ProviderError> {
        Self::from_config(&ProviderConfig::default())
    }

    /// Create a provider from configuration
    pub fn from_config(settings: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = HttpClient::with_timeout(Duration::from_secs(settings.timeout_seconds))?;
        Ok(Self::with_client(Arc::new(client), settings.clone()))
    }

    /// Create with a custom HTTP client (for testing)
    pub fn with_client(client: Arc<HttpClient>, settings: ProviderConfig) -> Self {
        Self { client, settings }
    }

    fn endpoint(&self, utility: &str) -> String {
        format!("{}/{}", self.settings.base_url.trim_end_matches('/'), utility)
    }

    /// Parameters NCBI asks every client to send
    fn identification_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("tool", self.settings.tool.clone())];
        if let Some(email) = &self.settings.email {
            params.push(("email", email.clone()));
        }
        if let Some(key) = &self.settings.api_key {
            params.push(("api_key", key.clone()));
        }
        params
    }

    /// Build E-utilities search URL for one page of identifiers
    fn build_search_url(&self, query: &str, retstart: usize, retmax: usize) -> String {
        let mut params = vec![
            ("db", "pubmed".to_string()),
            ("term", query.to_string()),
            ("retstart", retstart.to_string()),
            ("retmax", retmax.to_string()),
            ("retmode", "xml".to_string()),
        ];
        params.extend(self.identification_params());

        format!("{}?{}", self.endpoint("esearch.fcgi"), encode_params(&params))
    }

    /// Parse E-utilities search response XML
    fn parse_search_response(xml: &str) -> Result<SearchPage, ProviderError> {
        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct ESearchResult {
            Count: Option<usize>,
            IdList: Option<IdList>,
        }

        #[derive(Debug, Deserialize)]
        struct IdList {
            #[serde(rename = "Id", default)]
            ids: Vec<String>,
        }

        let result: ESearchResult = from_str(xml).map_err(|e| {
            ProviderError::Parse(format!("Failed to parse PubMed search XML: {}", e))
        })?;

        let ids = result.IdList.map(|list| list.ids).unwrap_or_default();
        Ok(SearchPage {
            count: result.Count.unwrap_or(ids.len()),
            ids,
        })
    }

    /// Build E-utilities fetch URL for specific PubMed IDs
    fn build_fetch_url(&self, ids: &[RecordId]) -> String {
        let mut params = vec![
            ("db", "pubmed".to_string()),
            ("id", ids.join(",")),
            ("retmode", "xml".to_string()),
        ];
        params.extend(self.identification_params());

        format!("{}?{}", self.endpoint("efetch.fcgi"), encode_params(&params))
    }

    /// Parse E-utilities fetch response XML
    fn parse_fetch_response(xml: &str) -> Result<Vec<Record>, ProviderError> {
        #[derive(Debug, Deserialize)]
        struct PubmedArticleSet {
            #[serde(rename = "PubmedArticle", default)]
            articles: Vec<PubmedArticle>,
        }

        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct PubmedArticle {
            MedlineCitation: Option<MedlineCitation>,
            PubmedData: Option<PubmedData>,
        }

        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct MedlineCitation {
            PMID: Option<Text>,
            Article: Option<Article>,
            #[serde(rename = "KeywordList", default)]
            keyword_lists: Vec<KeywordList>,
        }

        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct Article {
            Journal: Option<Journal>,
            ArticleTitle: Option<Text>,
            Abstract: Option<Abstract>,
            AuthorList: Option<AuthorList>,
        }

        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct Journal {
            JournalIssue: Option<JournalIssue>,
        }

        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct JournalIssue {
            PubDate: Option<PubDate>,
        }

        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct PubDate {
            Year: Option<String>,
            MedlineDate: Option<String>,
        }

        #[derive(Debug, Deserialize)]
        struct Text {
            #[serde(rename = "$text", default)]
            value: String,
        }

        #[derive(Debug, Deserialize)]
        struct Abstract {
            #[serde(rename = "AbstractText", default)]
            parts: Vec<AbstractText>,
        }

        #[derive(Debug, Deserialize)]
        struct AbstractText {
            #[serde(rename = "@Label")]
            label: Option<String>,
            #[serde(rename = "$text", default)]
            text: String,
        }

        #[derive(Debug, Deserialize)]
        struct KeywordList {
            #[serde(rename = "Keyword", default)]
            keywords: Vec<Text>,
        }

        #[derive(Debug, Deserialize)]
        struct AuthorList {
            #[serde(rename = "Author", default)]
            authors: Vec<Author>,
        }

        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct Author {
            LastName: Option<String>,
            ForeName: Option<String>,
            Initials: Option<String>,
            CollectiveName: Option<String>,
        }

        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct PubmedData {
            ArticleIdList: Option<ArticleIdList>,
        }

        #[derive(Debug, Deserialize)]
        struct ArticleIdList {
            #[serde(rename = "ArticleId", default)]
            ids: Vec<ArticleId>,
        }

        #[derive(Debug, Deserialize)]
        struct ArticleId {
            #[serde(rename = "@IdType")]
            id_type: String,
            #[serde(rename = "$text", default)]
            value: String,
        }

        let xml = flatten_inline_markup(xml)?;
        let result: PubmedArticleSet = from_str(&xml).map_err(fetch_parse_error)?;

        let mut records = Vec::with_capacity(result.articles.len());

        for article in result.articles {
            let Some(citation) = article.MedlineCitation else {
                continue;
            };

            let pmid = citation
                .PMID
                .as_ref()
                .map(|p| p.value.trim().to_string())
                .unwrap_or_default();

            let details = citation.Article.as_ref();

            let title = details
                .and_then(|a| a.ArticleTitle.as_ref())
                .map(|t| t.value.trim().to_string())
                .unwrap_or_default();

            let abstract_text = details
                .and_then(|a| a.Abstract.as_ref())
                .map(|ab| {
                    ab.parts
                        .iter()
                        .map(|part| match &part.label {
                            Some(label) => format!("{}: {}", label, part.text.trim()),
                            None => part.text.trim().to_string(),
                        })
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .unwrap_or_default();

            let keywords = citation
                .keyword_lists
                .iter()
                .flat_map(|list| list.keywords.iter())
                .map(|k| k.value.trim())
                .filter(|k| !k.is_empty())
                .collect::<Vec<_>>()
                .join(", ");

            let year = details
                .and_then(|a| a.Journal.as_ref())
                .and_then(|j| j.JournalIssue.as_ref())
                .and_then(|ji| ji.PubDate.as_ref())
                .and_then(|pd| {
                    pd.Year
                        .clone()
                        .or_else(|| pd.MedlineDate.as_deref().and_then(leading_year))
                })
                .unwrap_or_default();

            let first_author = details
                .and_then(|a| a.AuthorList.as_ref())
                .and_then(|al| al.authors.first())
                .map(|author| {
                    if let Some(collective) = &author.CollectiveName {
                        return collective.trim().to_string();
                    }
                    let last = author.LastName.as_deref().unwrap_or("");
                    let name = match (&author.ForeName, &author.Initials) {
                        (Some(fore), _) => format!("{} {}", fore, last),
                        (None, Some(initials)) => format!("{} {}", last, initials),
                        (None, None) => last.to_string(),
                    };
                    name.trim().to_string()
                })
                .unwrap_or_default();

            let in_pmc = article
                .PubmedData
                .as_ref()
                .and_then(|pd| pd.ArticleIdList.as_ref())
                .map(|ail| {
                    ail.ids
                        .iter()
                        .any(|id| id.id_type == "pmc" && !id.value.trim().is_empty())
                })
                .unwrap_or(false);

            let link = if pmid.is_empty() {
                String::new()
            } else {
                format!("https://pubmed.ncbi.nlm.nih.gov/{}/", pmid)
            };

            records.push(
                RecordBuilder::new(title)
                    .abstract_text(abstract_text)
                    .keywords(keywords)
                    .year(year)
                    .first_author(first_author)
                    .link(link)
                    .access_type(if in_pmc { ACCESS_FREE } else { ACCESS_SUBSCRIPTION })
                    .build(),
            );
        }

        Ok(records)
    }

    async fn get_text(&self, url: &str, action: &str) -> Result<String, ProviderError> {
        tracing::debug!(%url, "PubMed request");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProviderError::Network(format!("Failed to {}: {}", action, e)))?;

        if !response.status().is_success() {
            return Err(ProviderError::Api(format!(
                "PubMed API returned status: {}",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| ProviderError::Network(format!("Failed to read response: {}", e)))
    }
}

/// Strip element tags nested inside title, abstract and keyword elements,
/// keeping their text in document order.
///
/// `<ArticleTitle>Effect of <i>S. aureus</i> toxins</ArticleTitle>` becomes
/// `<ArticleTitle>Effect of S. aureus toxins</ArticleTitle>`, which the serde
/// structs read as a single text node.
fn flatten_inline_markup(xml: &str) -> Result<String, ProviderError> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    // Nesting depth below the enclosing mixed-content element
    let mut inline_depth: Option<usize> = None;

    loop {
        let event = reader.read_event().map_err(fetch_parse_error)?;
        match (&event, inline_depth) {
            (Event::Eof, _) => break,
            (Event::Start(_), Some(depth)) => {
                inline_depth = Some(depth + 1);
                continue;
            }
            (Event::End(_), Some(0)) => inline_depth = None,
            (Event::End(_), Some(depth)) => {
                inline_depth = Some(depth - 1);
                continue;
            }
            (Event::Empty(_), Some(_)) => continue,
            (Event::Start(start), None) if MIXED_CONTENT.contains(&start.name().as_ref()) => {
                inline_depth = Some(0);
            }
            _ => {}
        }
        writer.write_event(event).map_err(fetch_parse_error)?;
    }

    String::from_utf8(writer.into_inner()).map_err(fetch_parse_error)
}

fn fetch_parse_error(e: impl std::fmt::Display) -> ProviderError {
    ProviderError::Parse(format!("Failed to parse PubMed fetch XML: {}", e))
}

/// First four-digit year in a free-form MedlineDate such as "1998 Dec-1999 Jan"
fn leading_year(date: &str) -> Option<String> {
    date.split(|c: char| !c.is_ascii_digit())
        .find(|part| part.len() == 4)
        .map(str::to_string)
}

fn encode_params(params: &[(&str, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

#[async_trait]
impl SearchProvider for PubMedProvider {
    fn name(&self) -> &str {
        "PubMed"
    }

    async fn resolve_ids(&self, query: &str) -> Result<Vec<RecordId>, ProviderError> {
        if query.trim().is_empty() {
            return Err(ProviderError::InvalidRequest("empty query".to_string()));
        }

        let limit = self.settings.max_results;
        let mut ids: Vec<RecordId> = Vec::new();

        while ids.len() < limit {
            let retmax = self.settings.page_size.min(limit - ids.len());
            let url = self.build_search_url(query, ids.len(), retmax);
            let xml = self.get_text(&url, "search PubMed").await?;
            let page = Self::parse_search_response(&xml)?;

            let received = page.ids.len();
            ids.extend(page.ids);

            if received == 0 || ids.len() >= page.count {
                break;
            }
        }

        ids.truncate(limit);
        tracing::debug!(count = ids.len(), "resolved PubMed ids");
        Ok(ids)
    }

    async fn fetch_records(&self, ids: &[RecordId]) -> Result<Vec<Record>, ProviderError> {
        let mut records = Vec::with_capacity(ids.len());

        for chunk in ids.chunks(self.settings.fetch_batch_size.max(1)) {
            let url = self.build_fetch_url(chunk);
            let xml = self.get_text(&url, "fetch PubMed details").await?;
            records.extend(Self::parse_fetch_response(&xml)?);
        }

        if records.len() < ids.len() {
            tracing::debug!(
                requested = ids.len(),
                received = records.len(),
                "PubMed returned partial details"
            );
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FETCH_XML: &str = r#"<?xml version="1.0" ?>
<!DOCTYPE PubmedArticleSet PUBLIC "-//NLM//DTD PubMedArticle, 1st January 2024//EN" "https://dtd.nlm.nih.gov/ncbi/pubmed/out/pubmed_240101.dtd">
<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation Status="MEDLINE" Owner="NLM">
      <PMID Version="1">38000001</PMID>
      <Article PubModel="Print">
        <Journal>
          <JournalIssue CitedMedium="Internet">
            <PubDate><Year>2023</Year><Month>Nov</Month></PubDate>
          </JournalIssue>
        </Journal>
        <ArticleTitle>Adalimumab in refractory Kawasaki disease.</ArticleTitle>
        <Abstract>
          <AbstractText Label="BACKGROUND" NlmCategory="BACKGROUND">Some children do not respond.</AbstractText>
          <AbstractText Label="RESULTS" NlmCategory="RESULTS">Fever resolved.</AbstractText>
        </Abstract>
        <AuthorList CompleteYN="Y">
          <Author ValidYN="Y"><LastName>Tanaka</LastName><ForeName>Yuki</ForeName><Initials>Y</Initials></Author>
          <Author ValidYN="Y"><LastName>Smith</LastName><ForeName>Jane</ForeName><Initials>J</Initials></Author>
        </AuthorList>
      </Article>
      <KeywordList Owner="NOTNLM">
        <Keyword MajorTopicYN="N">Kawasaki disease</Keyword>
        <Keyword MajorTopicYN="N">TNF inhibitor</Keyword>
      </KeywordList>
    </MedlineCitation>
    <PubmedData>
      <ArticleIdList>
        <ArticleId IdType="pubmed">38000001</ArticleId>
        <ArticleId IdType="pmc">PMC1234567</ArticleId>
      </ArticleIdList>
    </PubmedData>
  </PubmedArticle>
  <PubmedArticle>
    <MedlineCitation Status="MEDLINE" Owner="NLM">
      <PMID Version="1">38000002</PMID>
      <Article PubModel="Print">
        <Journal>
          <JournalIssue CitedMedium="Print">
            <PubDate><MedlineDate>1998 Dec-1999 Jan</MedlineDate></PubDate>
          </JournalIssue>
        </Journal>
        <ArticleTitle>Coronary outcomes.</ArticleTitle>
        <AuthorList CompleteYN="Y">
          <Author ValidYN="Y"><CollectiveName>Kawasaki Study Group</CollectiveName></Author>
        </AuthorList>
      </Article>
    </MedlineCitation>
    <PubmedData>
      <ArticleIdList>
        <ArticleId IdType="pubmed">38000002</ArticleId>
      </ArticleIdList>
    </PubmedData>
  </PubmedArticle>
</PubmedArticleSet>"#;

    fn provider() -> PubMedProvider {
        let settings = ProviderConfig {
            api_key: None,
            email: Some("dev@example.org".to_string()),
            ..ProviderConfig::default()
        };
        PubMedProvider::from_config(&settings).unwrap()
    }

    #[test]
    fn test_build_search_url() {
        let url = provider().build_search_url("Kawasaki[Title/Abstract] AND Adalimumab[Text]", 0, 500);

        assert!(url.starts_with("https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi?"));
        assert!(url.contains("db=pubmed"));
        assert!(url.contains("term=Kawasaki%5BTitle%2FAbstract%5D%20AND%20Adalimumab%5BText%5D"));
        assert!(url.contains("retstart=0"));
        assert!(url.contains("retmax=500"));
        assert!(url.contains("email=dev%40example.org"));
        assert!(!url.contains("api_key"));
    }

    #[test]
    fn test_build_fetch_url() {
        let url = provider().build_fetch_url(&["1".to_string(), "2".to_string()]);

        assert!(url.contains("efetch.fcgi?"));
        assert!(url.contains("id=1%2C2"));
        assert!(url.contains("retmode=xml"));
    }

    #[test]
    fn test_parse_search_response() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8" ?>
<!DOCTYPE eSearchResult PUBLIC "-//NLM//DTD esearch 20060628//EN" "https://eutils.ncbi.nlm.nih.gov/eutils/dtd/20060628/esearch.dtd">
<eSearchResult><Count>3</Count><RetMax>2</RetMax><RetStart>0</RetStart><IdList>
<Id>111</Id>
<Id>222</Id>
</IdList></eSearchResult>"#;

        let page = PubMedProvider::parse_search_response(xml).unwrap();
        assert_eq!(page.count, 3);
        assert_eq!(page.ids, vec!["111".to_string(), "222".to_string()]);
    }

    #[test]
    fn test_parse_search_response_without_hits() {
        let xml = "<eSearchResult><Count>0</Count><RetMax>0</RetMax><RetStart>0</RetStart><IdList/></eSearchResult>";

        let page = PubMedProvider::parse_search_response(xml).unwrap();
        assert_eq!(page.count, 0);
        assert!(page.ids.is_empty());
    }

    #[test]
    fn test_parse_fetch_response() {
        let records = PubMedProvider::parse_fetch_response(FETCH_XML).unwrap();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.title, "Adalimumab in refractory Kawasaki disease.");
        assert_eq!(
            first.r#abstract,
            "BACKGROUND: Some children do not respond. RESULTS: Fever resolved."
        );
        assert_eq!(first.keywords, "Kawasaki disease, TNF inhibitor");
        assert_eq!(first.year, "2023");
        assert_eq!(first.first_author, "Yuki Tanaka");
        assert_eq!(first.link, "https://pubmed.ncbi.nlm.nih.gov/38000001/");
        assert_eq!(first.access_type, ACCESS_FREE);

        let second = &records[1];
        assert_eq!(second.year, "1998");
        assert_eq!(second.first_author, "Kawasaki Study Group");
        assert_eq!(second.r#abstract, crate::models::MISSING);
        assert_eq!(second.keywords, crate::models::MISSING);
        assert_eq!(second.access_type, ACCESS_SUBSCRIPTION);
    }

    #[test]
    fn test_parse_fetch_response_with_inline_markup() {
        let xml = r#"<?xml version="1.0" ?>
<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation Status="MEDLINE" Owner="NLM">
      <PMID Version="1">38000003</PMID>
      <Article PubModel="Print">
        <ArticleTitle>Effect of <i>Staphylococcus aureus</i> toxins on CD4<sup>+</sup> T cells.</ArticleTitle>
        <Abstract>
          <AbstractText Label="RESULTS">Levels of IL-1<i>&#x3b2;</i> fell (<i>p</i> &lt; 0.05) in <b>all <i>n</i></b> = 12 patients.</AbstractText>
          <AbstractText>CO<sub>2</sub> was stable.<br/></AbstractText>
        </Abstract>
      </Article>
      <KeywordList Owner="NOTNLM">
        <Keyword MajorTopicYN="N"><i>S. aureus</i></Keyword>
        <Keyword MajorTopicYN="N">superantigen</Keyword>
      </KeywordList>
    </MedlineCitation>
  </PubmedArticle>
</PubmedArticleSet>"#;

        let records = PubMedProvider::parse_fetch_response(xml).unwrap();
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(
            record.title,
            "Effect of Staphylococcus aureus toxins on CD4+ T cells."
        );
        assert_eq!(
            record.r#abstract,
            "RESULTS: Levels of IL-1\u{3b2} fell (p < 0.05) in all n = 12 patients. CO2 was stable."
        );
        assert_eq!(record.keywords, "S. aureus, superantigen");
        assert_eq!(record.link, "https://pubmed.ncbi.nlm.nih.gov/38000003/");
    }

    #[test]
    fn test_flatten_inline_markup_leaves_other_elements() {
        let xml = "<Article><ArticleTitle>A <i>b</i></ArticleTitle><Journal><Year>2020</Year></Journal></Article>";
        assert_eq!(
            flatten_inline_markup(xml).unwrap(),
            "<Article><ArticleTitle>A b</ArticleTitle><Journal><Year>2020</Year></Journal></Article>"
        );
    }

    #[test]
    fn test_parse_fetch_response_invalid_xml() {
        let result = PubMedProvider::parse_fetch_response("<PubmedArticleSet><PubmedArticle>");
        assert!(matches!(result, Err(ProviderError::Parse(_))));
    }

    #[test]
    fn test_leading_year() {
        assert_eq!(leading_year("1998 Dec-1999 Jan"), Some("1998".to_string()));
        assert_eq!(leading_year("Spring"), None);
    }
}
