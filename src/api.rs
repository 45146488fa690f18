// API client module: one typed method per backend endpoint. The client is
// synchronous and holds no state besides its transport, so every call is
// an independent round trip.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{
    AskRequest, Command, Created, ExecuteTransformation, Model, NewNote, NewNotebook, NewPodcast,
    NewTransformation, Note, NoteType, Notebook, Podcast, SearchRequest, SearchResults,
    SearchType, Source, SourceInput, Transformation,
};
use crate::transport::{HttpTransport, Request, Transport, Upload};

/// Backend client over any `Transport`. The binary uses `HttpTransport`;
/// tests plug in a scripted one.
pub struct ApiClient<T: Transport = HttpTransport> {
    transport: T,
}

/// Optional fields shared by every way of creating a source.
#[derive(Debug, Clone, Default)]
pub struct SourceOptions<'a> {
    pub notebook_id: Option<&'a str>,
    pub title: Option<&'a str>,
    pub transformations: &'a [String],
}

/// Fields of a new note besides its content.
#[derive(Debug, Clone, Default)]
pub struct NoteOptions<'a> {
    pub title: Option<&'a str>,
    pub notebook_id: Option<&'a str>,
    pub note_type: NoteType,
}

impl ApiClient<HttpTransport> {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(ApiClient {
            transport: HttpTransport::new(config)?,
        })
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn with_transport(transport: T) -> Self {
        ApiClient { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send a request and hand back the raw JSON body.
    pub fn raw(&self, request: Request) -> Result<Value> {
        self.transport.send(request)
    }

    fn typed<R: DeserializeOwned>(&self, what: &'static str, request: Request) -> Result<R> {
        let value = self.transport.send(request)?;
        decode(what, value)
    }

    // Notebooks

    pub fn list_notebooks(&self) -> Result<Vec<Notebook>> {
        self.typed("notebook list", Request::get("/notebooks"))
    }

    pub fn create_notebook(&self, name: &str, description: &str) -> Result<Notebook> {
        let body = NewNotebook { name, description };
        self.typed("notebook", Request::post("/notebooks", &body)?)
    }

    pub fn get_notebook(&self, id: &str) -> Result<Notebook> {
        self.typed("notebook", Request::get(format!("/notebooks/{}", id)))
    }

    // Sources

    pub fn list_sources(&self) -> Result<Vec<Source>> {
        self.typed("source list", Request::get("/sources"))
    }

    pub fn get_source(&self, id: &str) -> Result<Source> {
        self.typed("source", Request::get(format!("/sources/{}", id)))
    }

    /// Submit a new source. The raw body is returned because the backend
    /// may answer with either the source or a job reference.
    pub fn create_source(&self, input: &SourceInput, opts: &SourceOptions<'_>) -> Result<Value> {
        let request = match input {
            SourceInput::Url(url) => {
                let mut body = serde_json::json!({"type": "url", "url": url});
                add_source_options(&mut body, opts)?;
                Request::post("/sources", &body)?
            }
            SourceInput::Text(content) => {
                let mut body = serde_json::json!({"type": "text", "content": content});
                add_source_options(&mut body, opts)?;
                Request::post("/sources", &body)?
            }
            SourceInput::File(path) => {
                let mut fields = vec![("type".to_string(), "file".to_string())];
                if let Some(id) = opts.notebook_id {
                    fields.push(("notebook_id".into(), id.into()));
                }
                if let Some(title) = opts.title {
                    fields.push(("title".into(), title.into()));
                }
                if !opts.transformations.is_empty() {
                    let ids = serde_json::to_string(opts.transformations).map_err(Error::Encode)?;
                    fields.push(("transformations".into(), ids));
                }
                Request::post_multipart(
                    "/sources",
                    Upload {
                        fields,
                        file: path.clone(),
                    },
                )
            }
        };
        self.raw(request)
    }

    // Notes

    pub fn list_notes(&self, notebook_id: Option<&str>) -> Result<Vec<Note>> {
        let mut request = Request::get("/notes");
        if let Some(id) = notebook_id {
            request = request.query("notebook_id", id);
        }
        self.typed("note list", request)
    }

    pub fn create_note(&self, content: &str, opts: &NoteOptions<'_>) -> Result<Created> {
        let body = NewNote {
            content,
            note_type: opts.note_type,
            title: opts.title,
            notebook_id: opts.notebook_id,
        };
        self.typed("note", Request::post("/notes", &body)?)
    }

    // Search

    pub fn search(&self, query: &str, search_type: SearchType, limit: u32) -> Result<SearchResults> {
        self.typed("search", self.search_request(query, search_type, limit)?)
    }

    /// Same call as `search`, untyped, for `--json` dumps.
    pub fn search_raw(&self, query: &str, search_type: SearchType, limit: u32) -> Result<Value> {
        self.raw(self.search_request(query, search_type, limit)?)
    }

    fn search_request(&self, query: &str, search_type: SearchType, limit: u32) -> Result<Request> {
        let body = SearchRequest {
            query,
            search_type,
            limit,
            search_sources: true,
            search_notes: true,
        };
        Request::post("/search", &body)
    }

    pub fn ask(&self, question: &str, model_id: &str) -> Result<Value> {
        let body = AskRequest {
            question,
            strategy_model: model_id,
            answer_model: model_id,
            final_answer_model: model_id,
        };
        self.raw(Request::post("/search/ask/simple", &body)?)
    }

    // Transformations

    pub fn list_transformations(&self) -> Result<Vec<Transformation>> {
        self.typed("transformation list", Request::get("/transformations"))
    }

    pub fn create_transformation(&self, new: &NewTransformation<'_>) -> Result<Created> {
        self.typed("transformation", Request::post("/transformations", new)?)
    }

    pub fn execute_transformation(
        &self,
        transformation_id: &str,
        input_text: &str,
        model_id: &str,
    ) -> Result<Value> {
        let body = ExecuteTransformation {
            transformation_id,
            input_text,
            model_id,
        };
        self.raw(Request::post("/transformations/execute", &body)?)
    }

    // Models, commands, podcasts

    pub fn list_models(&self) -> Result<Vec<Model>> {
        self.typed("model list", Request::get("/models"))
    }

    pub fn get_command(&self, id: &str) -> Result<Command> {
        self.typed("command", Request::get(format!("/commands/{}", id)))
    }

    pub fn list_podcasts(&self) -> Result<Vec<Podcast>> {
        self.typed("podcast list", Request::get("/podcasts"))
    }

    pub fn create_podcast(&self, new: &NewPodcast<'_>) -> Result<Value> {
        self.raw(Request::post("/podcasts", new)?)
    }
}

pub(crate) fn decode<R: DeserializeOwned>(what: &'static str, value: Value) -> Result<R> {
    serde_json::from_value(value).map_err(|source| Error::Decode { what, source })
}

fn add_source_options(body: &mut Value, opts: &SourceOptions<'_>) -> Result<()> {
    let Some(map) = body.as_object_mut() else {
        return Ok(());
    };
    if let Some(id) = opts.notebook_id {
        map.insert("notebook_id".into(), id.into());
    }
    if let Some(title) = opts.title {
        map.insert("title".into(), title.into());
    }
    if !opts.transformations.is_empty() {
        let ids = serde_json::to_value(opts.transformations).map_err(Error::Encode)?;
        map.insert("transformations".into(), ids);
    }
    Ok(())
}
