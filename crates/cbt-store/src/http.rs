//! REST API store.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::instrument;

use cbt_core::model::{Classification, ExamResult, HealthStatus, NewQuestion, Question, Student};
use cbt_core::traits::{ResultStore, StoreResult};
use cbt_core::StoreError;

use crate::wire::{
    into_questions, DeleteManyBody, QuestionBody, ResultBody, StudentBody, WireBulkResponse,
    WireQuestion, WireResult, WireStudent,
};

pub const DEFAULT_API_URL: &str = "http://localhost:5001/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Store backed by the school's REST API.
pub struct HttpStore {
    base_url: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

impl HttpStore {
    pub fn new(base_url: &str, timeout_secs: u64) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_secs,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Send a request and map transport and status failures.
    async fn execute(&self, request: RequestBuilder) -> StoreResult<Response> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                StoreError::Timeout(self.timeout_secs)
            } else {
                StoreError::Unreachable(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if status < 400 {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.error)
            .unwrap_or_else(|| format!("HTTP error! status: {status}"));
        tracing::debug!(status, %message, "store returned an error");

        if status == 404 {
            Err(StoreError::NotFound(message))
        } else {
            Err(StoreError::Api { status, message })
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> StoreResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> StoreResult<T> {
        let response = self.execute(self.client.get(self.url(endpoint))).await?;
        Self::decode(response).await
    }

    async fn delete(&self, endpoint: &str) -> StoreResult<()> {
        self.execute(self.client.delete(self.url(endpoint))).await?;
        Ok(())
    }
}

#[async_trait]
impl ResultStore for HttpStore {
    fn name(&self) -> &str {
        "http"
    }

    /// A failed probe is reported as disconnected rather than as an error.
    #[instrument(skip(self))]
    async fn health(&self) -> StoreResult<HealthStatus> {
        match self.get::<serde_json::Value>("/health").await {
            Ok(body) => {
                let message = body
                    .get("message")
                    .or_else(|| body.get("status"))
                    .and_then(|v| v.as_str())
                    .map(str::to_string);
                Ok(HealthStatus {
                    connected: true,
                    message,
                })
            }
            Err(e) => Ok(HealthStatus {
                connected: false,
                message: Some(e.to_string()),
            }),
        }
    }

    #[instrument(skip(self))]
    async fn fetch_questions(&self) -> StoreResult<Vec<Question>> {
        let wire: Vec<WireQuestion> = self.get("/questions").await?;
        Ok(into_questions(wire))
    }

    #[instrument(skip(self, filter), fields(subject = %filter.subject, exam_type = %filter.exam_type))]
    async fn fetch_filtered_questions(&self, filter: &Classification) -> StoreResult<Vec<Question>> {
        let mut url = Url::parse(&self.url("/questions/filter"))
            .map_err(|e| StoreError::Unreachable(format!("invalid API URL: {e}")))?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("section", &filter.section.to_string())
                .append_pair("year", &filter.year.to_string())
                .append_pair("subject", &filter.subject)
                .append_pair("type", &filter.exam_type.to_string());
            if let Some(track) = filter.track {
                query.append_pair("track", &track.to_string());
            }
        }

        let response = self.execute(self.client.get(url)).await?;
        let wire: Vec<WireQuestion> = Self::decode(response).await?;
        Ok(into_questions(wire))
    }

    #[instrument(skip(self, question))]
    async fn add_question(&self, question: &NewQuestion) -> StoreResult<Question> {
        let request = self
            .client
            .post(self.url("/questions"))
            .json(&QuestionBody::from(question));
        let wire: WireQuestion = Self::decode(self.execute(request).await?).await?;
        Question::try_from(wire)
    }

    #[instrument(skip(self, questions), fields(count = questions.len()))]
    async fn add_questions(&self, questions: &[NewQuestion]) -> StoreResult<Vec<Question>> {
        let body: Vec<QuestionBody<'_>> = questions.iter().map(QuestionBody::from).collect();
        let request = self.client.post(self.url("/questions/bulk")).json(&body);
        let wire: WireBulkResponse = Self::decode(self.execute(request).await?).await?;
        Ok(into_questions(wire.questions))
    }

    #[instrument(skip(self, question))]
    async fn update_question(&self, id: &str, question: &NewQuestion) -> StoreResult<Question> {
        let request = self
            .client
            .put(self.url(&format!("/questions/{id}")))
            .json(&QuestionBody::from(question));
        let wire: WireQuestion = Self::decode(self.execute(request).await?).await?;
        Question::try_from(wire)
    }

    #[instrument(skip(self))]
    async fn delete_question(&self, id: &str) -> StoreResult<()> {
        self.delete(&format!("/questions/{id}")).await
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn delete_questions(&self, ids: &[String]) -> StoreResult<()> {
        let request = self
            .client
            .post(self.url("/questions/delete-many"))
            .json(&DeleteManyBody { ids });
        self.execute(request).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn fetch_results(&self) -> StoreResult<Vec<ExamResult>> {
        let wire: Vec<WireResult> = self.get("/results").await?;
        Ok(wire.into_iter().map(ExamResult::from).collect())
    }

    #[instrument(skip(self))]
    async fn fetch_student_results(&self, student_id: &str) -> StoreResult<Vec<ExamResult>> {
        let wire: Vec<WireResult> = self.get(&format!("/results/student/{student_id}")).await?;
        Ok(wire.into_iter().map(ExamResult::from).collect())
    }

    #[instrument(skip(self))]
    async fn result_stats(&self) -> StoreResult<serde_json::Value> {
        self.get("/results/stats").await
    }

    #[instrument(skip(self, result), fields(subject = %result.classification.subject, score = result.score))]
    async fn save_result(&self, result: &ExamResult) -> StoreResult<ExamResult> {
        let request = self
            .client
            .post(self.url("/results"))
            .json(&ResultBody::from(result));
        let wire: WireResult = Self::decode(self.execute(request).await?).await?;
        Ok(wire.into())
    }

    #[instrument(skip(self))]
    async fn delete_result(&self, id: &str) -> StoreResult<()> {
        self.delete(&format!("/results/{id}")).await
    }

    #[instrument(skip(self))]
    async fn clear_results(&self) -> StoreResult<()> {
        self.delete("/results/clear/all").await
    }

    #[instrument(skip(self))]
    async fn fetch_students(&self) -> StoreResult<Vec<Student>> {
        let wire: Vec<WireStudent> = self.get("/students").await?;
        wire.into_iter().map(Student::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn fetch_student(&self, id: &str) -> StoreResult<Student> {
        let wire: WireStudent = self.get(&format!("/students/{id}")).await?;
        Student::try_from(wire)
    }

    #[instrument(skip(self, student), fields(student = %student.id))]
    async fn upsert_student(&self, student: &Student) -> StoreResult<Student> {
        let request = self
            .client
            .post(self.url("/students/login"))
            .json(&StudentBody::from(student));
        let wire: WireStudent = Self::decode(self.execute(request).await?).await?;
        Student::try_from(wire)
    }

    #[instrument(skip(self, student))]
    async fn update_student(&self, id: &str, student: &Student) -> StoreResult<Student> {
        let request = self
            .client
            .put(self.url(&format!("/students/{id}")))
            .json(&StudentBody::from(student));
        let wire: WireStudent = Self::decode(self.execute(request).await?).await?;
        Student::try_from(wire)
    }

    #[instrument(skip(self))]
    async fn delete_student(&self, id: &str) -> StoreResult<()> {
        self.delete(&format!("/students/{id}")).await
    }
}
