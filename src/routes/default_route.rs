use actix_web::{get, HttpResponse, Responder};

#[get("/")]
async fn default() -> impl Responder {
    HttpResponse::Ok().body("Hi there, General Kenobi!")
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json("Server is running")
}
