use futures::StreamExt;
use ksql::prelude::*;
use ksql::schema::TypeKind;
use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, KsqlSchema)]
#[ksql(name = "Movie")]
struct Movie {
    #[serde(rename = "Id")]
    #[ksql(key, rename = "Id")]
    id: i32,
    #[serde(rename = "Title")]
    #[ksql(rename = "Title")]
    title: String,
    #[serde(rename = "Release_Year")]
    #[ksql(rename = "Release_Year")]
    release_year: Option<i32>,
}

fn m(member: &str) -> Expr {
    param("m").member(member)
}

#[test]
fn test_schema_source_resolves_wire_names() {
    let query = Query::from_source(Source::of::<Movie>())
        .filter(lambda(["m"], m("release_year").gt(lit(1980))))
        .select(lambda(
            ["m"],
            new_anon([("Title", m("title")), ("Year", m("release_year"))]),
        ))
        .take(2);
    assert_eq!(
        query.to_ksql(&CompileOptions::default()).unwrap(),
        "SELECT Title, Release_Year AS Year FROM Movies\n\
         WHERE Release_Year > 1980 EMIT CHANGES LIMIT 2;"
    );
}

#[test]
fn test_null_checks_against_schema_source() {
    let query = Query::from_source(Source::of::<Movie>())
        .filter(lambda(["m"], m("release_year").equals(null())));
    assert_eq!(
        ksql::compile(&query).unwrap(),
        "SELECT * FROM Movies\nWHERE Release_Year IS NULL EMIT CHANGES;"
    );
}

#[test]
fn test_insert_generated_instance() {
    let movie = Movie {
        id: 1,
        title: "Aliens".to_string(),
        release_year: None,
    };
    assert_eq!(
        insert_statement(&Movie::schema(), &movie, &InsertProperties::default()).unwrap(),
        "INSERT INTO Movies (Id, Title, Release_Year) VALUES (1, 'Aliens', NULL);"
    );
}

#[derive(Serialize, KsqlSchema)]
struct Tweet {
    #[ksql(key)]
    id: i64,
    message: String,
    is_robot: bool,
    amount: f64,
    tags: Vec<String>,
}

#[test]
fn test_insert_uses_lowercase_booleans_and_typed_empty_arrays() {
    let tweet = Tweet {
        id: 42,
        message: "Hello".to_string(),
        is_robot: true,
        amount: 1.5,
        tags: vec![],
    };
    let props = InsertProperties::default().entity_name("Tweet");
    assert_eq!(
        insert_statement(&Tweet::schema(), &tweet, &props).unwrap(),
        "INSERT INTO Tweets (id, message, is_robot, amount, tags) \
         VALUES (42, 'Hello', true, 1.5, ARRAY_REMOVE(ARRAY[''], ''));"
    );
    assert_eq!(
        Tweet::schema().find("tags").map(|c| &c.kind),
        Some(&TypeKind::array(TypeKind::String))
    );
}

#[test]
fn test_create_stream_as_select() {
    let query = Query::from_source(Source::of::<Movie>())
        .filter(lambda(["m"], m("title").not_equals(lit("E.T."))));
    let metadata = EntityCreationMetadata::new("classics").entity_name("Classics");
    assert_eq!(
        create_as_select(
            &query,
            &metadata,
            StatementKind::CreateStream,
            false,
            &CompileOptions::default()
        )
        .unwrap(),
        "CREATE STREAM Classics WITH ( KAFKA_TOPIC='classics', VALUE_FORMAT='Json' ) \
         AS SELECT * FROM Movies\nWHERE Title != 'E.T.' EMIT CHANGES;"
    );
}

const RESPONSE: &[u8] = b"{\"queryId\":\"abc\",\"columnNames\":[\"Id\",\"Title\",\"Release_Year\"],\"columnTypes\":[\"INTEGER\",\"STRING\",\"INTEGER\"]}
[1,\"Aliens\",1986]
[2,\"Die Hard\",null]
";

#[tokio::test]
async fn test_decode_response_into_rows() {
    let stream = QueryStream::<Movie>::open(
        lines_from_reader(RESPONSE),
        ResponseFormat::QueryStream,
        RowShape::Record,
    )
    .await
    .unwrap();
    assert_eq!(stream.header().query_id.as_deref(), Some("abc"));

    let movies: Vec<Movie> = stream.map(|row| row.unwrap()).collect().await;
    assert_eq!(
        movies,
        vec![
            Movie {
                id: 1,
                title: "Aliens".to_string(),
                release_year: Some(1986)
            },
            Movie {
                id: 2,
                title: "Die Hard".to_string(),
                release_year: None
            },
        ]
    );
}

#[tokio::test]
async fn test_subscription_over_decoded_rows() {
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Titles(Arc<Mutex<Vec<String>>>, Arc<Mutex<bool>>);

    impl Observer<Movie> for Titles {
        fn on_next(&mut self, row: Movie) {
            self.0.lock().unwrap().push(row.title);
        }

        fn on_error(&mut self, error: KsqlError) {
            panic!("unexpected error: {}", error);
        }

        fn on_completed(&mut self) {
            *self.1.lock().unwrap() = true;
        }
    }

    let rows = decode::<Movie, _>(
        lines_from_reader(RESPONSE),
        ResponseFormat::QueryStream,
        RowShape::Record,
    );
    let titles = Titles::default();
    subscribe(rows, titles.clone()).join().await.unwrap();

    assert_eq!(*titles.0.lock().unwrap(), vec!["Aliens", "Die Hard"]);
    assert!(*titles.1.lock().unwrap());
}
